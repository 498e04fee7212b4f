//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed test tokens.

use crate::crypto_fixtures::{EC_PRIVATE_KEY_A, RSA_PRIVATE_KEY_A};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for creating signed test JWTs
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("alice")
///     .publish(&["orders.>"])
///     .expires_in(3600)
///     .sign_rs256(RSA_PRIVATE_KEY_A);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    publish: Option<Vec<String>>,
    subscribe: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Create a builder with no claims set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `sub`
    pub fn for_subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the legacy `user` claim
    pub fn for_user(self, user: &str) -> Self {
        self.claim("user", json!(user))
    }

    /// Set the legacy `name` claim
    pub fn for_name(self, name: &str) -> Self {
        self.claim("name", json!(name))
    }

    /// Set `exp` to the given number of seconds from now
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Set `exp` to an absolute Unix timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.claim("exp", json!(timestamp))
    }

    /// Set publish subject patterns
    pub fn publish(mut self, subjects: &[&str]) -> Self {
        self.publish = Some(subjects.iter().map(ToString::to_string).collect());
        self
    }

    /// Set subscribe subject patterns
    pub fn subscribe(mut self, subjects: &[&str]) -> Self {
        self.subscribe = Some(subjects.iter().map(ToString::to_string).collect());
        self
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> Value {
        let mut claims = self.claims.clone();
        if self.publish.is_some() || self.subscribe.is_some() {
            claims.insert(
                "permissions".to_string(),
                json!({
                    "publish": self.publish.clone().unwrap_or_default(),
                    "subscribe": self.subscribe.clone().unwrap_or_default(),
                }),
            );
        }
        Value::Object(claims)
    }

    /// Sign with RS256 using a PEM private key
    pub fn sign_rs256(&self, private_key_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .expect("fixture RSA key should parse");
        self.sign(Algorithm::RS256, &key)
    }

    /// Sign with ES256 using a PEM private key
    pub fn sign_es256(&self, private_key_pem: &str) -> String {
        let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())
            .expect("fixture EC key should parse");
        self.sign(Algorithm::ES256, &key)
    }

    /// Sign with ES256 using a PKCS#8 DER private key
    pub fn sign_es256_der(&self, private_key_pkcs8: &[u8]) -> String {
        self.sign(Algorithm::ES256, &EncodingKey::from_ec_der(private_key_pkcs8))
    }

    /// Sign with RS256 using [`RSA_PRIVATE_KEY_A`]
    pub fn sign_rsa_a(&self) -> String {
        self.sign_rs256(RSA_PRIVATE_KEY_A)
    }

    /// Sign with ES256 using [`EC_PRIVATE_KEY_A`]
    pub fn sign_ec_a(&self) -> String {
        self.sign_es256(EC_PRIVATE_KEY_A)
    }

    fn sign(&self, alg: Algorithm, key: &EncodingKey) -> String {
        encode(&Header::new(alg), &self.build(), key).expect("test token should sign")
    }
}

/// Strip the header segment, producing a two-segment legacy token.
pub fn to_legacy_token(token: &str) -> String {
    token
        .split_once('.')
        .map(|(_, rest)| rest.to_string())
        .expect("token should contain a header segment")
}
