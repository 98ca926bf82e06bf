//! Concurrent authentication server.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   client ──────▶│ listener ──▶ session (one task per conn)     │
//!                 │                  │                           │
//!                 │                  ▼                           │
//!   reply ◀───────│            account store (read-only)         │
//!                 │                                              │
//!                 │ signals ──▶ shutdown ──▶ drain (active == 0) │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use auth_server::config::{load_config, ConfigError, ServerConfig};
use auth_server::lifecycle::signals::spawn_signal_handler;
use auth_server::net::listener::{Listener, ListenerError};
use auth_server::observability::init_logging;
use auth_server::{AccountStore, AuthServer, Shutdown};

#[derive(Parser)]
#[command(name = "auth-server")]
#[command(about = "Concurrent TCP authentication server", long_about = None)]
struct Cli {
    /// TCP port of the server
    server_port: u16,

    /// Whitespace-separated file of username / password-hash pairs
    accounts_file: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (overrides the configuration file)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    config.listener.port = cli.server_port;
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    if let Err(e) = init_logging(&config.observability.log_level) {
        eprintln!("Warning: logging not initialised: {e}");
    }

    tracing::info!("auth-server v{} starting", env!("CARGO_PKG_VERSION"));

    let store = AccountStore::load(&cli.accounts_file)?;

    let listener = Listener::bind(&config.listener)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = AuthServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    Ok(())
}
