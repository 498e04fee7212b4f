//! Connection-side types exchanged with the host server.

use crate::claims::Permissions;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Options a client presented when connecting.
///
/// The authorization string is a bearer credential and is redacted in Debug
/// output.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    authorization: SecretString,
}

impl ClientOptions {
    #[must_use]
    pub fn new(authorization: impl Into<String>) -> Self {
        Self {
            authorization: SecretString::from(authorization.into()),
        }
    }

    #[must_use]
    pub fn authorization(&self) -> &str {
        self.authorization.expose_secret()
    }
}

/// Identity derived from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Never empty.
    pub username: String,

    /// `None` when the token carried no permissions, or carried at least
    /// one invalid subject pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

/// A pending client connection, as seen by the authenticator.
pub trait ClientAuthentication {
    /// Options sent by the client, if any.
    fn options(&self) -> Option<&ClientOptions>;

    /// Attach the resolved identity to the connection. Called only after
    /// successful authentication.
    fn register_identity(&mut self, identity: Identity);
}
