//! Token verification against an ordered list of key providers.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The token's `alg` must belong to the family of the trial key: RSA
//!   keys only verify `RS*` tokens, EC keys only verify `ES*` tokens
//! - Providers are tried strictly in order and the first success wins
//! - Any error returned from [`Verifier::verify`] is a rejection

use crate::claims::Claims;
use crate::error::{AuthError, Result};
use crate::keys::{KeyKind, KeyProvider, PublicKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, Header, Validation};
use std::borrow::Cow;
use std::str::FromStr;

/// Default maximum accepted token size in bytes (8KB).
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 8192;

/// Upper bound for a configured maximum token size (64KB).
pub const MAX_TOKEN_BYTES_LIMIT: usize = 65536;

/// Header segment prepended to two-segment legacy tokens:
/// base64url of `{"alg":"ES256","typ":"JWT"}`.
pub const LEGACY_HEADER_SEGMENT: &str = "eyJhbGciOiJFUzI1NiIsInR5cCI6IkpXVCJ9";

/// Verification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Reject tokens that carry no `exp` claim.
    pub strict_expiry: bool,

    /// Accept `payload.signature` tokens by prepending
    /// [`LEGACY_HEADER_SEGMENT`].
    pub accept_legacy_tokens: bool,

    /// Tokens longer than this are rejected before decoding.
    pub max_token_bytes: usize,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            strict_expiry: false,
            accept_legacy_tokens: true,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }
}

/// A token that passed verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub header: Header,
    pub claims: Claims,

    /// Position of the provider whose key verified the token.
    pub provider_index: usize,
}

/// Signature family an `alg` header value belongs to.
#[must_use]
pub fn algorithm_family(alg: &str) -> Option<KeyKind> {
    match alg {
        "RS256" | "RS384" | "RS512" => Some(KeyKind::Rsa),
        "ES256" | "ES384" | "ES512" => Some(KeyKind::Ec),
        _ => None,
    }
}

/// Read the `alg` header value without verifying the token.
///
/// # Errors
///
/// - `TokenFormat` if the token is not three segments or the header is
///   not base64url-encoded JSON
/// - `UnsupportedAlgorithm` if the header has no string `alg`
pub fn extract_alg(token: &str) -> Result<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "broker_auth.verifier",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(AuthError::TokenFormat(format!(
            "expected 3 segments, got {}",
            parts.len()
        )));
    }

    let header_part = parts
        .first()
        .ok_or_else(|| AuthError::TokenFormat("missing header".to_string()))?;
    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_part)
        .map_err(|e| AuthError::TokenFormat(format!("invalid header encoding: {e}")))?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::TokenFormat(format!("invalid header JSON: {e}")))?;

    if !header.is_object() {
        return Err(AuthError::TokenFormat("header is not an object".to_string()));
    }

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| AuthError::UnsupportedAlgorithm {
            expected: "RSA or ECDSA".to_string(),
            actual: "<missing>".to_string(),
        })
}

/// Verifies tokens against key providers.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    options: VerifyOptions,
}

impl Verifier {
    #[must_use]
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verify `token` against `providers` at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify_at`].
    pub fn verify(&self, token: &str, providers: &[KeyProvider]) -> Result<VerifiedToken> {
        self.verify_at(token, providers, chrono::Utc::now().timestamp())
    }

    /// Verify `token` against `providers`, treating `now` as the current
    /// Unix time.
    ///
    /// Prefer [`Verifier::verify`] in production code. This variant exists
    /// so that expiry boundaries can be tested without wall-clock
    /// dependence.
    ///
    /// # Errors
    ///
    /// - `TokenFormat` for empty, oversized or malformed tokens
    /// - `Disabled` if `providers` is empty
    /// - otherwise the error from the last provider tried
    pub fn verify_at(
        &self,
        token: &str,
        providers: &[KeyProvider],
        now: i64,
    ) -> Result<VerifiedToken> {
        if token.is_empty() {
            return Err(AuthError::TokenFormat("token is empty".to_string()));
        }

        if token.len() > self.options.max_token_bytes {
            tracing::debug!(
                target: "broker_auth.verifier",
                token_size = token.len(),
                max_size = self.options.max_token_bytes,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::TokenFormat(format!(
                "token is {} bytes, maximum is {}",
                token.len(),
                self.options.max_token_bytes
            )));
        }

        let token = self.normalize(token);
        let alg = extract_alg(&token)?;

        let mut last_err = AuthError::Disabled;
        for (index, provider) in providers.iter().enumerate() {
            let key = match provider.public_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(
                        target: "broker_auth.verifier",
                        provider = index,
                        source = %provider.source_name(),
                        error = %e,
                        "Skipping provider: key unavailable"
                    );
                    last_err = e;
                    continue;
                }
            };

            match self.verify_with_key(&token, &alg, &key, now) {
                Ok((header, claims)) => {
                    tracing::debug!(
                        target: "broker_auth.verifier",
                        provider = index,
                        fingerprint = %key.fingerprint(),
                        "Token verified"
                    );
                    return Ok(VerifiedToken {
                        header,
                        claims,
                        provider_index: index,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        target: "broker_auth.verifier",
                        provider = index,
                        source = %provider.source_name(),
                        error = %e,
                        "Token not verified by provider"
                    );
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    /// Apply the legacy two-segment accommodation when enabled.
    fn normalize<'a>(&self, token: &'a str) -> Cow<'a, str> {
        if self.options.accept_legacy_tokens && token.splitn(3, '.').count() == 2 {
            Cow::Owned(format!("{LEGACY_HEADER_SEGMENT}.{token}"))
        } else {
            Cow::Borrowed(token)
        }
    }

    fn verify_with_key(
        &self,
        token: &str,
        alg: &str,
        key: &PublicKey,
        now: i64,
    ) -> Result<(Header, Claims)> {
        let unsupported = || AuthError::UnsupportedAlgorithm {
            expected: key.kind().to_string(),
            actual: alg.to_string(),
        };

        if algorithm_family(alg) != Some(key.kind()) {
            return Err(unsupported());
        }
        let algorithm = Algorithm::from_str(alg).map_err(|_| unsupported())?;

        // exp is checked by Claims itself so strict mode and the exact
        // boundary apply; jsonwebtoken only verifies the signature here.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, key.decoding_key(), &validation)?;
        data.claims.validate_at(now, self.options.strict_expiry)?;

        Ok((data.header, data.claims))
    }
}
