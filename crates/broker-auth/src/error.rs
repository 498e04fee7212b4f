//! Error types for broker connection authentication.
//!
//! Every per-request variant is caught at the [`Authenticator`] boundary,
//! logged, and collapsed into a plain rejection. Nothing in here is ever
//! sent back to the connecting client.
//!
//! [`Authenticator`]: crate::authenticator::Authenticator

use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// Errors produced while configuring or running authentication.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Invalid or empty construction input. Fatal at setup time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key source is missing, unreadable or unparseable.
    #[error("Key load error for '{source_name}': {reason}")]
    KeyLoad {
        /// File name, or `"<static>"` for in-memory keys.
        source_name: String,
        reason: String,
    },

    /// Token is empty, oversized or structurally malformed.
    #[error("Token format error: {0}")]
    TokenFormat(String),

    /// Token algorithm does not belong to the family of the trial key,
    /// or is not supported at all.
    #[error("Unsupported algorithm: expected {expected} but got {actual}")]
    UnsupportedAlgorithm { expected: String, actual: String },

    /// Signature verification or expiry check failed.
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Claims carry no usable username.
    #[error("Identity error: {0}")]
    Identity(String),

    /// No key providers are configured; authentication is disabled.
    #[error("No public keys configured")]
    Disabled,

    /// Connection carried no options or an empty authorization string.
    #[error("No credentials presented")]
    MissingCredentials,
}

impl AuthError {
    /// Returns `true` for errors raised while handling a single connection
    /// attempt, as opposed to setup-time configuration errors.
    #[must_use]
    pub fn is_per_request(&self) -> bool {
        !matches!(self, AuthError::Config(_))
    }

    pub(crate) fn key_load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        AuthError::KeyLoad {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::TokenFormat(err.to_string()),
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthError::UnsupportedAlgorithm {
                    expected: "algorithm matching key type".to_string(),
                    actual: err.to_string(),
                }
            }
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey => AuthError::key_load("<decoding key>", err.to_string()),
            _ => AuthError::TokenValidation(err.to_string()),
        }
    }
}

/// Result type alias using `AuthError`
pub type Result<T> = std::result::Result<T, AuthError>;
