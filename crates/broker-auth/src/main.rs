//! Broker Auth
//!
//! Operator tool: checks a token against the configured public keys exactly
//! as the broker would, and prints the identity it resolves to.
//!
//! The token is read from the first argument, or from stdin when no
//! argument is given.

use broker_auth::{Authenticator, ClientAuthentication, ClientOptions, Config, Identity};
use std::io::Read;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connection stand-in that records the registered identity.
struct CliConnection {
    options: Option<ClientOptions>,
    identity: Option<Identity>,
}

impl ClientAuthentication for CliConnection {
    fn options(&self) -> Option<&ClientOptions> {
        self.options.as_ref()
    }

    fn register_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "broker_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(?config, "Configuration loaded successfully");

    let authenticator = Authenticator::from_config(&config).map_err(|e| {
        error!("Failed to configure public keys: {}", e);
        e
    })?;

    let token = match std::env::args().nth(1) {
        Some(token) => token,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut connection = CliConnection {
        options: Some(ClientOptions::new(token.trim())),
        identity: None,
    };

    if !authenticator.check(&mut connection) {
        error!("Token rejected");
        return Ok(ExitCode::FAILURE);
    }

    match connection.identity {
        Some(identity) => {
            println!("{}", serde_json::to_string_pretty(&identity)?);
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}
