//! End-to-end tests for `Authenticator::check`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use broker_auth::{
    Authenticator, Config, KeyProvider, Permissions, VerifyOptions,
};
use broker_auth_test_utils::*;
use std::collections::HashMap;
use std::sync::Arc;

fn static_provider(pem: &str) -> KeyProvider {
    KeyProvider::from_pem(pem.as_bytes()).unwrap()
}

fn authenticator_with(pems: &[&str]) -> (Authenticator, Arc<RecordingLogger>) {
    let providers = pems.iter().map(|pem| static_provider(pem)).collect();
    let auth = Authenticator::new(providers, VerifyOptions::default());
    let logger = Arc::new(RecordingLogger::new());
    auth.set_logger(Some(logger.clone()));
    (auth, logger)
}

// =========================================================================
// Gate 1: configuration
// =========================================================================

#[test]
fn test_no_providers_always_rejects() {
    let (auth, logger) = authenticator_with(&[]);

    for token in [
        TestTokenBuilder::new().for_subject("alice").sign_rsa_a(),
        TestTokenBuilder::new().for_subject("alice").sign_ec_a(),
        String::new(),
        "garbage".to_string(),
    ] {
        let mut conn = MockConnection::with_token(&token);
        assert!(!auth.check(&mut conn));
        assert!(conn.registered().is_empty());
    }

    assert!(logger.messages(LogLevel::Error).is_empty());
    assert!(logger.contains(LogLevel::Debug, "no public keys"));
}

// =========================================================================
// Gate 2: credential presence
// =========================================================================

#[test]
fn test_missing_options_rejected() {
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);
    let mut conn = MockConnection::without_options();
    assert!(!auth.check(&mut conn));
    assert!(conn.registered().is_empty());
    assert!(logger.messages(LogLevel::Error).is_empty());
}

#[test]
fn test_empty_authorization_rejected() {
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);
    let mut conn = MockConnection::with_token("");
    assert!(!auth.check(&mut conn));
    assert!(conn.registered().is_empty());
}

// =========================================================================
// Gate 3: verification
// =========================================================================

#[test]
fn test_rsa_token_round_trip_by_key_family() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_in(3600)
        .sign_rsa_a();

    // EC-only provider list rejects an RSA-signed token
    let (ec_only, logger) = authenticator_with(&[EC_PUBLIC_KEY_A, EC_PUBLIC_KEY_B]);
    let mut conn = MockConnection::with_token(&token);
    assert!(!ec_only.check(&mut conn));
    assert!(conn.registered().is_empty());
    assert!(logger.contains(LogLevel::Error, "expected ECDSA but got RS256"));

    // The matching RSA provider accepts it
    let (rsa, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);
    let mut conn = MockConnection::with_token(&token);
    assert!(rsa.check(&mut conn));
    assert_eq!(conn.identity().username, "alice");
}

#[test]
fn test_ec_token_rejected_by_rsa_provider() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_ec_a();

    let (rsa_only, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);
    let mut conn = MockConnection::with_token(&token);
    assert!(!rsa_only.check(&mut conn));
    assert!(logger.contains(LogLevel::Error, "expected RSA but got ES256"));
}

#[test]
fn test_signing_key_found_at_any_position() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_ec_a();
    let keys = [RSA_PUBLIC_KEY_A, RSA_PUBLIC_KEY_B, EC_PUBLIC_KEY_B];

    for position in 0..=keys.len() {
        let mut pems: Vec<&str> = keys.to_vec();
        pems.insert(position, EC_PUBLIC_KEY_A);
        let (auth, _) = authenticator_with(&pems);

        let verified = auth
            .verifier()
            .verify(&token, auth.providers())
            .unwrap();
        assert_eq!(verified.provider_index, position);

        let mut conn = MockConnection::with_token(&token);
        assert!(auth.check(&mut conn), "key at position {position} not found");
    }
}

#[test]
fn test_unreadable_provider_is_skipped() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_rsa_a();
    let providers = vec![
        KeyProvider::lazy_file("/nonexistent/first.pem").unwrap(),
        static_provider(RSA_PUBLIC_KEY_A),
    ];
    let auth = Authenticator::new(providers, VerifyOptions::default());

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
}

#[test]
fn test_key_from_other_signer_rejected() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .sign_rs256(RSA_PRIVATE_KEY_B);
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(!auth.check(&mut conn));
    assert!(logger.contains(LogLevel::Error, "failed to auth token"));
}

#[test]
fn test_expired_token_rejected() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_in(-60)
        .sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(!auth.check(&mut conn));
    assert!(logger.contains(LogLevel::Error, "token expired"));
}

#[test]
fn test_expiry_boundary_with_explicit_clock() {
    let now = 1_700_000_000;
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let at_now = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_at(now)
        .sign_rsa_a();
    let opts = broker_auth::ClientOptions::new(at_now);
    assert!(auth.authenticate_at(Some(&opts), now).is_ok());

    let one_before = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_at(now - 1)
        .sign_rsa_a();
    let opts = broker_auth::ClientOptions::new(one_before);
    assert!(auth.authenticate_at(Some(&opts), now).is_err());
}

#[test]
fn test_strict_mode_rejects_missing_expiry() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_rsa_a();

    let lenient = Authenticator::new(
        vec![static_provider(RSA_PUBLIC_KEY_A)],
        VerifyOptions::default(),
    );
    assert!(lenient.check(&mut MockConnection::with_token(&token)));

    let strict = Authenticator::new(
        vec![static_provider(RSA_PUBLIC_KEY_A)],
        VerifyOptions {
            strict_expiry: true,
            ..VerifyOptions::default()
        },
    );
    assert!(!strict.check(&mut MockConnection::with_token(&token)));

    let with_exp = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_in(60)
        .sign_rsa_a();
    assert!(strict.check(&mut MockConnection::with_token(&with_exp)));
}

#[test]
fn test_legacy_two_segment_token() {
    let token = TestTokenBuilder::new().for_subject("legacy").sign_ec_a();
    let legacy = to_legacy_token(&token);
    let (auth, _) = authenticator_with(&[EC_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&legacy);
    assert!(auth.check(&mut conn));
    assert_eq!(conn.identity().username, "legacy");
}

// =========================================================================
// Gate 4: identity derivation
// =========================================================================

#[test]
fn test_subject_preferred_over_user() {
    let token = TestTokenBuilder::new()
        .for_subject("subject-name")
        .for_user("user-name")
        .for_name("display-name")
        .sign_rsa_a();
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
    assert_eq!(conn.identity().username, "subject-name");
}

#[test]
fn test_user_used_without_subject() {
    let token = TestTokenBuilder::new().for_user("user-name").sign_rsa_a();
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
    assert_eq!(conn.identity().username, "user-name");
}

#[test]
fn test_name_used_last() {
    let token = TestTokenBuilder::new().for_name("display-name").sign_rsa_a();
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
    assert_eq!(conn.identity().username, "display-name");
}

#[test]
fn test_no_username_rejected() {
    let token = TestTokenBuilder::new().expires_in(60).sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(!auth.check(&mut conn));
    assert!(conn.registered().is_empty());
    assert_eq!(
        logger.messages(LogLevel::Error),
        vec!["username is required".to_string()]
    );
}

#[test]
fn test_valid_permissions_attached() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .publish(&["orders.>", "audit.alice"])
        .subscribe(&["events.*.created"])
        .sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
    assert_eq!(
        conn.identity().permissions,
        Some(Permissions {
            publish: vec!["orders.>".to_string(), "audit.alice".to_string()],
            subscribe: vec!["events.*.created".to_string()],
        })
    );
    assert!(logger.contains(LogLevel::Debug, "with perms true"));
}

#[test]
fn test_one_invalid_subscribe_pattern_drops_all_permissions() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .publish(&["orders.>"])
        .subscribe(&["events.*", "events.>.bad", "audit.alice"])
        .sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn), "invalid permissions must not reject");
    assert_eq!(conn.identity().username, "alice");
    assert_eq!(conn.identity().permissions, None);
    assert!(logger.contains(
        LogLevel::Error,
        "\"events.>.bad\" is invalid subject in subscribe"
    ));
    assert!(logger.contains(LogLevel::Debug, "with perms false"));
}

#[test]
fn test_no_permissions_claim_means_none() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_rsa_a();
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut conn = MockConnection::with_token(&token);
    assert!(auth.check(&mut conn));
    assert_eq!(conn.identity().permissions, None);
}

// =========================================================================
// Idempotence and logging
// =========================================================================

#[test]
fn test_check_is_idempotent() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .publish(&["orders.>"])
        .expires_in(3600)
        .sign_rsa_a();
    let (auth, _) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    let mut first = MockConnection::with_token(&token);
    let mut second = MockConnection::with_token(&token);
    assert!(auth.check(&mut first));
    assert!(auth.check(&mut second));
    assert_eq!(first.identity(), second.identity());
}

#[test]
fn test_logger_can_be_removed() {
    let token = TestTokenBuilder::new().for_subject("alice").sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    auth.set_logger(None);
    assert!(auth.check(&mut MockConnection::with_token(&token)));
    assert!(!auth.check(&mut MockConnection::with_token("bad")));
    assert!(logger.entries().is_empty());
}

#[test]
fn test_token_never_logged() {
    let token = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_in(-10)
        .sign_rsa_a();
    let (auth, logger) = authenticator_with(&[RSA_PUBLIC_KEY_A]);

    assert!(!auth.check(&mut MockConnection::with_token(&token)));
    for (_, message) in logger.entries() {
        assert!(!message.contains(&token));
    }
}

// =========================================================================
// Configuration
// =========================================================================

#[test]
fn test_from_config_with_key_directory() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    write_key_file(dir.path(), "01-rsa.pem", RSA_PUBLIC_KEY_A);
    write_key_file(dir.path(), "02-ec.pem", EC_PUBLIC_KEY_A);

    let vars = HashMap::from([
        (
            "BROKER_AUTH_PUBLIC_KEY".to_string(),
            dir.path().display().to_string(),
        ),
        ("BROKER_AUTH_STRICT_EXPIRY".to_string(), "true".to_string()),
    ]);
    let config = Config::from_vars(&vars)?;
    let auth = Authenticator::from_config(&config)?;
    assert_eq!(auth.providers().len(), 2);
    assert!(auth.verifier().options().strict_expiry);

    let ec_token = TestTokenBuilder::new()
        .for_subject("alice")
        .expires_in(60)
        .sign_ec_a();
    let verified = auth.verifier().verify(&ec_token, auth.providers())?;
    assert_eq!(verified.provider_index, 1);

    let rsa_token = TestTokenBuilder::new().for_subject("bob").sign_rsa_a();
    assert!(
        !auth.check(&mut MockConnection::with_token(&rsa_token)),
        "strict mode from config must reject tokens without exp"
    );

    Ok(())
}

#[test]
fn test_from_config_missing_path() {
    let vars = HashMap::from([(
        "BROKER_AUTH_PUBLIC_KEY".to_string(),
        "/nonexistent/keys".to_string(),
    )]);
    let config = Config::from_vars(&vars).unwrap();
    assert!(matches!(
        Authenticator::from_config(&config),
        Err(broker_auth::AuthError::Config(_))
    ));
}
