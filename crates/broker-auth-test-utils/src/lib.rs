//! Test utilities for broker-auth
//!
//! This crate provides fixtures and helpers for testing the broker
//! authenticator:
//!
//! - **Crypto fixtures**: fixed RSA/EC key pairs and fresh P-256 keys
//! - **Token builders**: fluent builders for signed test tokens
//! - **Mocks**: recording connection and logger implementations
//! - **Key files**: helpers to write key files with pinned modification times
//!
//! # Example
//!
//! ```rust,ignore
//! use broker_auth_test_utils::*;
//!
//! let token = TestTokenBuilder::new().for_subject("alice").sign_rsa_a();
//! let mut conn = MockConnection::with_token(&token);
//! assert!(authenticator.check(&mut conn));
//! assert_eq!(conn.identity().username, "alice");
//! ```

pub mod crypto_fixtures;
pub mod key_files;
pub mod mocks;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use key_files::*;
pub use mocks::*;
pub use token_builders::*;
