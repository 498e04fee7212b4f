//! Host-facing logger capability.
//!
//! The authenticator reports connection outcomes through a [`Logger`]
//! supplied by the host. [`TracingLogger`] is the default and forwards to
//! `tracing`; hosts embedding their own logging install a different one
//! with [`Authenticator::set_logger`].
//!
//! [`Authenticator::set_logger`]: crate::authenticator::Authenticator::set_logger

use std::fmt;

/// Leveled, formatted logging as exposed by the host server.
pub trait Logger: Send + Sync {
    fn error(&self, args: fmt::Arguments<'_>);

    fn debug(&self, args: fmt::Arguments<'_>);
}

/// Logger emitting `tracing` events under the `broker_auth` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "broker_auth", "{}", args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "broker_auth", "{}", args);
    }
}
