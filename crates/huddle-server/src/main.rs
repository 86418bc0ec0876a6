//! # Huddle Server
//!
//! Realtime chat server: group rooms and direct messages over WebSocket.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! huddle
//!
//! # Run with custom config
//! huddle --config /path/to/huddle.toml
//!
//! # Run with environment variables
//! HUDDLE_PORT=8080 HUDDLE_HOST=0.0.0.0 huddle
//! ```

mod config;
mod dispatch;
mod handlers;
mod metrics;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Huddle realtime chat server
#[derive(Parser, Debug)]
#[command(name = "huddle", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle_server=debug,huddle_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load(cli.config.as_deref())?;

    tracing::info!(
        name = %config.name,
        environment = %config.environment,
        "Starting Huddle server on {}:{}",
        config.host,
        config.port
    );

    metrics::init_metrics();

    handlers::run_server(config).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_flag_forms() {
        let cli = Cli::try_parse_from(["huddle", "--config=/etc/huddle/custom.toml"]).unwrap();
        assert_eq!(
            cli.config.as_deref(),
            Some(Path::new("/etc/huddle/custom.toml"))
        );

        let cli = Cli::try_parse_from(["huddle", "-c", "local.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(Path::new("local.toml")));

        let cli = Cli::try_parse_from(["huddle"]).unwrap();
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["huddle", "--conifg", "x.toml"]).is_err());
    }
}
