//! Token authentication for message-broker connections.
//!
//! Inbound connections present a signed JWT as their authorization string.
//! The token is verified against one or more configured RSA or EC public
//! keys; the verified claims yield the connection's username and an
//! optional set of publish/subscribe permissions for the host to enforce.
//!
//! # Modules
//!
//! - `keys` - Static and lazily reloaded file-backed key providers
//! - `claims` - Token payload and expiry rule
//! - `verifier` - Ordered multi-key verification with algorithm gating
//! - `authenticator` - Per-connection entry point
//! - `subject` - Subject pattern grammar
//! - `connection` - Types exchanged with the host connection
//! - `logger` - Host logger capability
//! - `config` - Configuration from environment

#![warn(clippy::pedantic)]

/// Module for the per-connection authenticator
pub mod authenticator;

/// Module for token claims
pub mod claims;

/// Module for configuration from environment
pub mod config;

/// Module for host connection types
pub mod connection;

/// Module for error types
pub mod error;

/// Module for public key providers
pub mod keys;

/// Module for the host logger capability
pub mod logger;

/// Module for subject pattern validation
pub mod subject;

/// Module for token verification
pub mod verifier;

pub use authenticator::Authenticator;
pub use claims::{Claims, Permissions};
pub use config::{Config, ConfigError};
pub use connection::{ClientAuthentication, ClientOptions, Identity};
pub use error::{AuthError, Result};
pub use keys::{load_key_providers, parse_public_key, KeyKind, KeyProvider, PublicKey};
pub use logger::{Logger, TracingLogger};
pub use subject::{NatsSubjectValidator, SubjectValidator};
pub use verifier::{VerifiedToken, Verifier, VerifyOptions};
