//! Public key providers.
//!
//! A [`KeyProvider`] supplies the verification key for one configured
//! signer. Two variants exist:
//!
//! - **Static**: wraps a key parsed once from PEM bytes at construction.
//! - **LazyFile**: owns a file path and re-reads the file only when its
//!   modification time differs from the one observed at the last load.
//!
//! # Concurrency
//!
//! A single LazyFile provider is shared by every concurrent authentication
//! attempt. Its stat → compare → reload → replace sequence runs under one
//! mutex, and the cached key and modification time are swapped as a single
//! value, so no caller can observe a key paired with the wrong timestamp.

use crate::error::{AuthError, Result};
use jsonwebtoken::DecodingKey;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

/// Source name reported for keys that do not come from a file.
const STATIC_SOURCE: &str = "<static>";

/// PEM labels accepted as public key material: SubjectPublicKeyInfo and
/// PKCS#1 RSA.
const PUBLIC_KEY_LABELS: [&str; 2] = ["PUBLIC KEY", "RSA PUBLIC KEY"];

/// Family of a parsed public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Rsa,
    Ec,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Rsa => write!(f, "RSA"),
            KeyKind::Ec => write!(f, "ECDSA"),
        }
    }
}

/// A parsed public key tagged with its family.
#[derive(Clone)]
pub struct PublicKey {
    kind: KeyKind,
    decoding_key: DecodingKey,
    fingerprint: String,
}

impl PublicKey {
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Hex SHA-256 of the PEM bytes the key was parsed from.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("kind", &self.kind)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Parse a PEM-encoded RSA or EC public key.
///
/// RSA is attempted first, then EC.
///
/// # Errors
///
/// Returns `AuthError::KeyLoad` if the input is empty, is not a
/// `PUBLIC KEY` or `RSA PUBLIC KEY` PEM block, or is neither an RSA nor an
/// EC public key.
pub fn parse_public_key(pem: &[u8]) -> Result<PublicKey> {
    parse_named(STATIC_SOURCE, pem)
}

fn parse_named(source_name: &str, pem: &[u8]) -> Result<PublicKey> {
    if pem.iter().all(u8::is_ascii_whitespace) {
        return Err(AuthError::key_load(source_name, "no public key data"));
    }

    // DecodingKey::from_rsa_pem also takes private key blocks
    match pem_label(pem) {
        Some(label) if PUBLIC_KEY_LABELS.contains(&label) => {}
        Some(label) => {
            return Err(AuthError::key_load(
                source_name,
                format!("PEM block '{label}' is not a public key"),
            ))
        }
        None => return Err(AuthError::key_load(source_name, "no PEM block found")),
    }

    let fingerprint = hex::encode(Sha256::digest(pem));

    let rsa_err = match DecodingKey::from_rsa_pem(pem) {
        Ok(decoding_key) => {
            return Ok(PublicKey {
                kind: KeyKind::Rsa,
                decoding_key,
                fingerprint,
            })
        }
        Err(e) => e,
    };

    match DecodingKey::from_ec_pem(pem) {
        Ok(decoding_key) => Ok(PublicKey {
            kind: KeyKind::Ec,
            decoding_key,
            fingerprint,
        }),
        Err(ec_err) => {
            tracing::debug!(
                target: "broker_auth.keys",
                source = %source_name,
                rsa_error = %rsa_err,
                ec_error = %ec_err,
                "PEM is neither an RSA nor an EC public key"
            );
            Err(AuthError::key_load(
                source_name,
                format!("not an RSA or EC public key: {rsa_err}"),
            ))
        }
    }
}

/// Label of the first PEM block, e.g. `PUBLIC KEY`.
fn pem_label(pem: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(pem).ok()?;
    let (_, rest) = text.split_once("-----BEGIN ")?;
    rest.split_once("-----").map(|(label, _)| label.trim())
}

/// Supplies a public key on demand.
#[derive(Debug)]
pub enum KeyProvider {
    Static(StaticKeyProvider),
    LazyFile(LazyFileKeyProvider),
}

impl KeyProvider {
    /// Build a static provider from PEM bytes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` on empty input and `AuthError::KeyLoad`
    /// if the bytes do not hold an RSA or EC public key.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        StaticKeyProvider::new(pem).map(KeyProvider::Static)
    }

    /// Build a lazy provider for a key file. The file is not touched until
    /// the first call to [`KeyProvider::public_key`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the path is empty.
    pub fn lazy_file(path: impl Into<PathBuf>) -> Result<Self> {
        LazyFileKeyProvider::new(path).map(KeyProvider::LazyFile)
    }

    /// Return the current public key.
    ///
    /// # Errors
    ///
    /// Static providers never fail. LazyFile providers return
    /// `AuthError::KeyLoad` when the file is missing, empty or unparseable.
    pub fn public_key(&self) -> Result<Arc<PublicKey>> {
        match self {
            KeyProvider::Static(p) => Ok(p.public_key()),
            KeyProvider::LazyFile(p) => p.public_key(),
        }
    }

    /// Human-readable name of the key source, for diagnostics.
    #[must_use]
    pub fn source_name(&self) -> String {
        match self {
            KeyProvider::Static(_) => STATIC_SOURCE.to_string(),
            KeyProvider::LazyFile(p) => p.path.display().to_string(),
        }
    }
}

/// Provider holding an already parsed key.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    key: Arc<PublicKey>,
}

impl StaticKeyProvider {
    /// # Errors
    ///
    /// See [`KeyProvider::from_pem`].
    pub fn new(pem: &[u8]) -> Result<Self> {
        if pem.is_empty() {
            return Err(AuthError::Config(
                "empty bytes for public key provided".to_string(),
            ));
        }
        let key = parse_public_key(pem)?;
        Ok(Self { key: Arc::new(key) })
    }

    #[must_use]
    pub fn public_key(&self) -> Arc<PublicKey> {
        Arc::clone(&self.key)
    }
}

/// Key and the modification time of the file it was read from.
#[derive(Debug)]
struct CachedKey {
    key: Arc<PublicKey>,
    modified: SystemTime,
}

/// Provider that re-reads its key file whenever the file's modification
/// time changes.
pub struct LazyFileKeyProvider {
    path: PathBuf,
    cache: Mutex<Option<CachedKey>>,
}

impl fmt::Debug for LazyFileKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFileKeyProvider")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl LazyFileKeyProvider {
    /// # Errors
    ///
    /// See [`KeyProvider::lazy_file`].
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(AuthError::Config(
                "empty filename for public key provided".to_string(),
            ));
        }
        Ok(Self {
            path,
            cache: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached key, reloading it first if the file changed.
    ///
    /// # Errors
    ///
    /// See [`KeyProvider::public_key`]. On error the previous cache entry,
    /// if any, is left in place.
    pub fn public_key(&self) -> Result<Arc<PublicKey>> {
        let source = self.path.display().to_string();

        // A poisoned lock still holds a consistent entry: it is only ever
        // replaced by a single assignment.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        let metadata = fs::metadata(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                AuthError::key_load(&source, "file does not exist")
            } else {
                AuthError::key_load(&source, format!("could not stat file: {e}"))
            }
        })?;
        let modified = metadata
            .modified()
            .map_err(|e| AuthError::key_load(&source, format!("no modification time: {e}")))?;

        if let Some(cached) = cache.as_ref() {
            if cached.modified == modified {
                return Ok(Arc::clone(&cached.key));
            }
        }

        let content = fs::read(&self.path)
            .map_err(|e| AuthError::key_load(&source, format!("could not read file: {e}")))?;
        if content.is_empty() {
            return Err(AuthError::key_load(&source, "file is empty"));
        }
        let key = Arc::new(parse_named(&source, &content)?);

        tracing::info!(
            target: "broker_auth.keys",
            path = %source,
            kind = %key.kind(),
            fingerprint = %key.fingerprint(),
            "Public key loaded"
        );

        *cache = Some(CachedKey {
            key: Arc::clone(&key),
            modified,
        });
        Ok(key)
    }
}

/// Build providers for a key file or a directory of key files.
///
/// A file yields a single LazyFile provider. A directory yields one LazyFile
/// provider per regular file it contains, ordered by file name. Symlinks
/// are resolved before the check, so links to directories and dangling
/// links are skipped along with nested directories.
///
/// # Errors
///
/// Returns `AuthError::Config` if the path is empty, cannot be inspected,
/// or names a directory without any files.
pub fn load_key_providers(path: impl AsRef<Path>) -> Result<Vec<KeyProvider>> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(AuthError::Config(
            "empty filename for public key provided".to_string(),
        ));
    }

    let metadata = fs::metadata(path).map_err(|e| {
        AuthError::Config(format!("cannot access '{}': {e}", path.display()))
    })?;

    if !metadata.is_dir() {
        return Ok(vec![KeyProvider::lazy_file(path)?]);
    }

    let entries = fs::read_dir(path).map_err(|e| {
        AuthError::Config(format!("cannot read directory '{}': {e}", path.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AuthError::Config(format!("cannot read directory '{}': {e}", path.display()))
        })?;
        let entry_path = entry.path();
        // Follows symlinks, so a link to a directory is skipped too
        match fs::metadata(&entry_path) {
            Ok(meta) if meta.is_file() => files.push(entry_path),
            Ok(_) => {}
            Err(e) => tracing::debug!(
                target: "broker_auth.keys",
                path = %entry_path.display(),
                error = %e,
                "Skipping unreadable directory entry"
            ),
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(AuthError::Config(format!(
            "no public key files in directory '{}'",
            path.display()
        )));
    }

    tracing::debug!(
        target: "broker_auth.keys",
        directory = %path.display(),
        count = files.len(),
        "Configured public key files"
    );

    files.into_iter().map(KeyProvider::lazy_file).collect()
}
