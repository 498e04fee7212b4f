//! Authentication configuration.
//!
//! Configuration is loaded from environment variables. No field holds
//! secret material; public key paths are printed as-is.

use crate::verifier::{VerifyOptions, DEFAULT_MAX_TOKEN_BYTES, MAX_TOKEN_BYTES_LIMIT};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// File or directory holding PEM public keys.
pub const ENV_PUBLIC_KEY: &str = "BROKER_AUTH_PUBLIC_KEY";

/// Reject tokens without an `exp` claim.
pub const ENV_STRICT_EXPIRY: &str = "BROKER_AUTH_STRICT_EXPIRY";

/// Accept two-segment tokens without a header.
pub const ENV_ACCEPT_LEGACY_TOKENS: &str = "BROKER_AUTH_ACCEPT_LEGACY_TOKENS";

/// Maximum token size in bytes.
pub const ENV_MAX_TOKEN_BYTES: &str = "BROKER_AUTH_MAX_TOKEN_BYTES";

/// Authentication configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Key file, or directory of key files.
    pub public_key_path: PathBuf,

    /// Reject tokens without `exp` (default: false).
    pub strict_expiry: bool,

    /// Accept headerless two-segment tokens as ES256 (default: true).
    pub accept_legacy_tokens: bool,

    /// Maximum accepted token size (default: 8192).
    pub max_token_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBool(String),

    #[error("Invalid maximum token size configuration: {0}")]
    InvalidMaxTokenBytes(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let public_key_path = vars
            .get(ENV_PUBLIC_KEY)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_PUBLIC_KEY.to_string()))?;

        let strict_expiry = parse_bool(vars, ENV_STRICT_EXPIRY, false)?;
        let accept_legacy_tokens = parse_bool(vars, ENV_ACCEPT_LEGACY_TOKENS, true)?;

        let max_token_bytes = if let Some(value_str) = vars.get(ENV_MAX_TOKEN_BYTES) {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidMaxTokenBytes(format!(
                    "{ENV_MAX_TOKEN_BYTES} must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidMaxTokenBytes(format!(
                    "{ENV_MAX_TOKEN_BYTES} must be greater than 0"
                )));
            }

            if value > MAX_TOKEN_BYTES_LIMIT {
                return Err(ConfigError::InvalidMaxTokenBytes(format!(
                    "{ENV_MAX_TOKEN_BYTES} must not exceed {MAX_TOKEN_BYTES_LIMIT}, got {value}"
                )));
            }

            value
        } else {
            DEFAULT_MAX_TOKEN_BYTES
        };

        Ok(Config {
            public_key_path,
            strict_expiry,
            accept_legacy_tokens,
            max_token_bytes,
        })
    }

    /// Verification settings derived from this configuration.
    #[must_use]
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            strict_expiry: self.strict_expiry,
            accept_legacy_tokens: self.accept_legacy_tokens,
            max_token_bytes: self.max_token_bytes,
        }
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool(format!(
                "{name} must be true or false, got '{v}'"
            ))),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(ENV_PUBLIC_KEY.to_string(), "/etc/broker/keys".to_string())])
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.public_key_path, PathBuf::from("/etc/broker/keys"));
        assert!(!config.strict_expiry);
        assert!(config.accept_legacy_tokens);
        assert_eq!(config.max_token_bytes, DEFAULT_MAX_TOKEN_BYTES);
        assert_eq!(config.verify_options(), VerifyOptions::default());
    }

    #[test]
    fn test_missing_public_key() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == ENV_PUBLIC_KEY));

        let mut vars = HashMap::new();
        vars.insert(ENV_PUBLIC_KEY.to_string(), String::new());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_boolean_flags() {
        let mut vars = base_vars();
        vars.insert(ENV_STRICT_EXPIRY.to_string(), "TRUE".to_string());
        vars.insert(ENV_ACCEPT_LEGACY_TOKENS.to_string(), "0".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert!(config.strict_expiry);
        assert!(!config.accept_legacy_tokens);

        let options = config.verify_options();
        assert!(options.strict_expiry);
        assert!(!options.accept_legacy_tokens);
    }

    #[test]
    fn test_invalid_boolean() {
        let mut vars = base_vars();
        vars.insert(ENV_STRICT_EXPIRY.to_string(), "maybe".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidBool(_))
        ));
    }

    #[test]
    fn test_max_token_bytes() {
        let mut vars = base_vars();
        vars.insert(ENV_MAX_TOKEN_BYTES.to_string(), "4096".to_string());
        assert_eq!(Config::from_vars(&vars).unwrap().max_token_bytes, 4096);

        vars.insert(ENV_MAX_TOKEN_BYTES.to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidMaxTokenBytes(_))
        ));

        vars.insert(
            ENV_MAX_TOKEN_BYTES.to_string(),
            (MAX_TOKEN_BYTES_LIMIT + 1).to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidMaxTokenBytes(_))
        ));

        vars.insert(ENV_MAX_TOKEN_BYTES.to_string(), "lots".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidMaxTokenBytes(_))
        ));
    }
}
