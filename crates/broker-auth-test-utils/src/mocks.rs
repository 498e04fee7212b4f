//! Mock host collaborators
//!
//! [`MockConnection`] stands in for a pending broker connection and
//! [`RecordingLogger`] captures the messages the authenticator reports.

use broker_auth::{ClientAuthentication, ClientOptions, Identity, Logger};
use std::fmt;
use std::sync::Mutex;

/// Pending connection that records what the authenticator registers.
#[derive(Debug, Default)]
pub struct MockConnection {
    options: Option<ClientOptions>,
    registered: Vec<Identity>,
}

impl MockConnection {
    /// Connection presenting `token` as its authorization string
    pub fn with_token(token: &str) -> Self {
        Self {
            options: Some(ClientOptions::new(token)),
            registered: Vec::new(),
        }
    }

    /// Connection that sent no options at all
    pub fn without_options() -> Self {
        Self::default()
    }

    /// Every identity registered so far, oldest first
    pub fn registered(&self) -> &[Identity] {
        &self.registered
    }

    /// The single registered identity; panics unless exactly one exists
    pub fn identity(&self) -> &Identity {
        assert_eq!(
            self.registered.len(),
            1,
            "expected exactly one registered identity, got {:?}",
            self.registered
        );
        &self.registered[0]
    }
}

impl ClientAuthentication for MockConnection {
    fn options(&self) -> Option<&ClientOptions> {
        self.options.as_ref()
    }

    fn register_identity(&mut self, identity: Identity) {
        self.registered.push(identity);
    }
}

/// Log level of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Debug,
}

/// Logger that keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages, in order
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    fn record(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.entries.lock().unwrap().push((level, args.to_string()));
    }
}

impl Logger for RecordingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        self.record(LogLevel::Error, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.record(LogLevel::Debug, args);
    }
}
