//! # relay
//!
//! Support relay binary: parses flags, sets up logging and runs the
//! HTTP/WebSocket server until interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use relay_server::{RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Real-time support relay between anonymous users and operators.
#[derive(Parser, Debug)]
#[command(name = "relay", about = "Real-time support relay")]
struct Cli {
    /// Host to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory of static client assets.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Log output format.
    #[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Seconds to wait for background tasks on shutdown.
    #[arg(long, default_value_t = 10)]
    shutdown_timeout: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            public_dir: self.public_dir.clone(),
            ..ServerConfig::default()
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.server_config();
    tracing::info!(
        bind = %config.bind_addr(),
        public_dir = %config.public_dir.display(),
        "starting relay"
    );

    let metrics = relay_server::metrics::install_recorder()
        .context("failed to install metrics recorder")?;
    let server = RelayServer::new(config).with_metrics(metrics);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(%addr, "relay ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    server
        .shutdown()
        .graceful_shutdown(
            handle.into_handles(),
            Some(Duration::from_secs(cli.shutdown_timeout)),
        )
        .await;
    Ok(())
}
