//! JWT claims structure.
//!
//! Contains the claims extracted from verified tokens. The identity fields
//! are redacted in Debug output to prevent exposure in logs.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publish/subscribe subject patterns granted to a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscribe: Vec<String>,
}

/// Token payload accepted by the authenticator.
///
/// `user` and `name` are legacy aliases for `sub`; see [`Claims::username`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Legacy username alias - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Legacy username alias - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Claims")
            .field("sub", &redact(&self.sub))
            .field("exp", &self.exp)
            .field("user", &redact(&self.user))
            .field("name", &redact(&self.name))
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl Claims {
    /// Check token validity against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`Claims::validate_at`].
    pub fn validate(&self, strict_expiry: bool) -> Result<()> {
        self.validate_at(chrono::Utc::now().timestamp(), strict_expiry)
    }

    /// Deterministic validity check against an explicit `now`.
    ///
    /// A token without `exp` is valid unless `strict_expiry` is set. A token
    /// with `exp` is valid while `exp >= now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenValidation` for expired tokens, or for
    /// tokens without `exp` in strict mode.
    pub fn validate_at(&self, now: i64, strict_expiry: bool) -> Result<()> {
        match self.exp {
            None if strict_expiry => {
                tracing::debug!(target: "broker_auth.claims", "Token rejected: missing exp in strict mode");
                Err(AuthError::TokenValidation(
                    "token has no expiry".to_string(),
                ))
            }
            None => Ok(()),
            Some(exp) if exp < now => {
                tracing::debug!(
                    target: "broker_auth.claims",
                    exp = exp,
                    now = now,
                    "Token rejected: expired"
                );
                Err(AuthError::TokenValidation("token expired".to_string()))
            }
            Some(_) => Ok(()),
        }
    }

    /// Username for the connection: the first non-empty of `sub`, `user`,
    /// `name`.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        [&self.sub, &self.user, &self.name]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.is_empty())
    }
}
