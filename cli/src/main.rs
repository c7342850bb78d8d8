//! Hotel back-office server CLI
//!
//! Runs the reservation server as a standalone process, a systemd
//! service or a container entrypoint.
//!
//! ```sh
//! # Run with default config (~/.config/hms-server/config.toml)
//! hms-server
//!
//! # Custom config path
//! hms-server --config /etc/hms-server/config.toml
//!
//! # Override port and data directory
//! hms-server --port 5001 --data-dir /var/lib/hms
//!
//! # Validate config without starting
//! hms-server --check
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};

use hms_server::config::{AppConfig, ConfigError, StorageBackend};
use hms_server::server::{init_tracing, ServerHandle, ServerOptions};

/// Hotel back-office reservation server.
#[derive(Parser, Debug)]
#[command(
    name = "hms-server",
    version,
    about = "Hotel back-office reservation server",
    long_about = "Line-oriented TCP server for the hotel back-office client: \
                  rooms, reservations, payments and front-desk state.\n\n\
                  Default config: ~/.config/hms-server/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "HMS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the directory holding the CSV record files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Keep all records in memory with a small seeded hotel.
    #[arg(long)]
    memory: bool,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

/// Load the config file. A broken file falls back to defaults unless
/// `strict`, in which case it is an error.
fn load_config(
    path: &Path,
    strict: bool,
) -> Result<(AppConfig, Option<ConfigError>), ConfigError> {
    match AppConfig::load(path) {
        Ok(cfg) => Ok((cfg, None)),
        Err(e) if strict => Err(e),
        Err(e) => Ok((AppConfig::default(), Some(e))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(hms_server::default_config_path);

    let (mut config, load_error) = load_config(&config_path, cli.check)?;

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref dir) = cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.memory {
        config.storage.backend = StorageBackend::Memory;
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Address     : {}", config.address());
        match config.storage.backend {
            StorageBackend::Csv => {
                println!("   Data dir    : {}", config.storage.data_dir.display())
            }
            StorageBackend::Memory => println!("   Storage     : in-memory"),
        }
        println!(
            "   Expiry      : {}",
            if config.expiry.enabled {
                config.expiry.sweep_at.as_str()
            } else {
                "disabled"
            }
        );
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        ..Default::default()
    })
    .await?;

    handle.install_signal_handler();

    info!(addr = %handle.local_addr(), "🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_mode_refuses_unparsable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = load_config(&path, true).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let (config, load_error) = load_config(&path, false).unwrap();
        assert!(load_error.is_some());
        assert_eq!(config.server.port, AppConfig::default().server.port);
    }

    #[test]
    fn missing_config_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_config, load_error) = load_config(&dir.path().join("absent.toml"), true).unwrap();
        assert!(load_error.is_none());
    }
}
