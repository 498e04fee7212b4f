//! Connection authenticator.
//!
//! [`Authenticator::check`] is the entry point wired into the host's
//! pluggable authentication hook. Each call runs four gates and stops at the
//! first failure:
//!
//! 1. At least one key provider is configured
//! 2. The client presented a non-empty authorization string
//! 3. The token verifies against a provider
//! 4. The claims name a user
//!
//! Only after all four pass is an identity registered with the connection.
//! Invalid permission patterns never reject a connection; they only drop
//! the permission grant.

use crate::claims::{Claims, Permissions};
use crate::config::Config;
use crate::connection::{ClientAuthentication, ClientOptions, Identity};
use crate::error::{AuthError, Result};
use crate::keys::{load_key_providers, KeyProvider};
use crate::logger::{Logger, TracingLogger};
use crate::subject::{NatsSubjectValidator, SubjectValidator};
use crate::verifier::{Verifier, VerifyOptions};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::instrument;

/// Authenticates broker connections with signed tokens.
pub struct Authenticator {
    providers: Vec<KeyProvider>,
    verifier: Verifier,
    subject_validator: Arc<dyn SubjectValidator>,
    logger: RwLock<Option<Arc<dyn Logger>>>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("providers", &self.providers)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator over `providers`, using the default subject
    /// grammar and logging through `tracing`.
    #[must_use]
    pub fn new(providers: Vec<KeyProvider>, options: VerifyOptions) -> Self {
        Self {
            providers,
            verifier: Verifier::new(options),
            subject_validator: Arc::new(NatsSubjectValidator),
            logger: RwLock::new(Some(Arc::new(TracingLogger))),
        }
    }

    /// Create an authenticator from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the configured key path is unusable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let providers = load_key_providers(&config.public_key_path)?;
        tracing::info!(
            target: "broker_auth.authenticator",
            providers = providers.len(),
            strict_expiry = config.strict_expiry,
            accept_legacy_tokens = config.accept_legacy_tokens,
            "Authenticator configured"
        );
        Ok(Self::new(providers, config.verify_options()))
    }

    /// Replace the subject pattern validator.
    #[must_use]
    pub fn with_subject_validator(mut self, validator: impl SubjectValidator + 'static) -> Self {
        self.subject_validator = Arc::new(validator);
        self
    }

    /// Install the host logger. `None` silences host-facing log calls.
    ///
    /// Safe to call while other threads are inside [`Authenticator::check`].
    pub fn set_logger(&self, logger: Option<Arc<dyn Logger>>) {
        let mut slot = self.logger.write().unwrap_or_else(PoisonError::into_inner);
        *slot = logger;
    }

    #[must_use]
    pub fn providers(&self) -> &[KeyProvider] {
        &self.providers
    }

    #[must_use]
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Authenticate a pending connection and register its identity.
    ///
    /// Returns `true` only if an identity was registered.
    #[instrument(skip_all)]
    pub fn check(&self, connection: &mut dyn ClientAuthentication) -> bool {
        let identity = match self.authenticate(connection.options()) {
            Ok(identity) => identity,
            Err(e) => {
                self.report_rejection(&e);
                return false;
            }
        };

        self.debug(format_args!(
            "Verified user {:?}, with perms {}",
            identity.username,
            identity.permissions.is_some()
        ));
        connection.register_identity(identity);
        true
    }

    /// Run the four gates against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// - `Disabled` if no providers are configured
    /// - `MissingCredentials` if `options` is absent or its authorization
    ///   string is empty
    /// - any verification error from [`Verifier::verify`]
    /// - `Identity` if the claims carry no username
    pub fn authenticate(&self, options: Option<&ClientOptions>) -> Result<Identity> {
        self.authenticate_at(options, chrono::Utc::now().timestamp())
    }

    /// [`Authenticator::authenticate`] with an explicit `now`.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub fn authenticate_at(&self, options: Option<&ClientOptions>, now: i64) -> Result<Identity> {
        if self.providers.is_empty() {
            return Err(AuthError::Disabled);
        }

        let token = options
            .map(ClientOptions::authorization)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let verified = self.verifier.verify_at(token, &self.providers, now)?;
        self.derive_identity(verified.claims)
    }

    fn derive_identity(&self, claims: Claims) -> Result<Identity> {
        let username = claims
            .username()
            .map(ToString::to_string)
            .ok_or_else(|| AuthError::Identity("username is required".to_string()))?;

        let permissions = claims
            .permissions
            .filter(|perms| self.permissions_valid(perms));

        Ok(Identity {
            username,
            permissions,
        })
    }

    /// All publish and subscribe patterns must be valid for the set to be
    /// granted.
    fn permissions_valid(&self, permissions: &Permissions) -> bool {
        let lists = [
            ("publish", &permissions.publish),
            ("subscribe", &permissions.subscribe),
        ];
        for (kind, subjects) in lists {
            if let Some(bad) = subjects
                .iter()
                .find(|s| !self.subject_validator.is_valid_subject(s))
            {
                self.error(format_args!("{bad:?} is invalid subject in {kind}"));
                return false;
            }
        }
        true
    }

    fn report_rejection(&self, err: &AuthError) {
        match err {
            AuthError::Disabled => self.debug(format_args!("no public keys")),
            AuthError::MissingCredentials => self.debug(format_args!("no credentials presented")),
            AuthError::Identity(reason) => self.error(format_args!("{reason}")),
            other => self.error(format_args!("failed to auth token, {other}")),
        }
    }

    fn current_logger(&self) -> Option<Arc<dyn Logger>> {
        self.logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = self.current_logger() {
            logger.error(args);
        }
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = self.current_logger() {
            logger.debug(args);
        }
    }
}
