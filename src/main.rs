//! # Mosque Times Entry Point
//!
//! Sets up logging, reads the port and config path from the command line and
//! runs the dashboard until Ctrl-C.
//!
//! ```bash
//! mosque_times                      # port 3000, ./config.json5 if present
//! mosque_times 8080 mosque.json5    # explicit port and config file
//! ```
//!
//! `RUST_LOG` selects the log level, `info` by default.

use mosque_times::error::MosqueTimesError;
use mosque_times::server;
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), MosqueTimesError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3000);

    let config_file_path = env::args().nth(2).map(PathBuf::from);

    tracing::info!("Starting mosque times dashboard");

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    server::run(port, config_file_path, cancel_token).await?;

    tracing::info!("Mosque times dashboard shutting down");
    Ok(())
}
