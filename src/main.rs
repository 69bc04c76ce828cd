//! Cardinality demo service.
//!
//! One binary, three roles:
//!
//! ```text
//!     loadgen ──▶ frontend ──/process──▶ api ──/work──▶ worker
//!                 │ /demo                                │ queue sampler
//!                 │ /status, /toggle-cardinality         │ error injection
//!                 │ /gold-metrics                        │
//!                 └─────────── /metrics (Prometheus, every role) ─────────
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use cardinality_demo::config::{load_config, ServiceRole};
use cardinality_demo::config::validation::validate_config;
use cardinality_demo::lifecycle::{trigger_on_signal, Shutdown};
use cardinality_demo::observability::{logging, metrics};
use cardinality_demo::HttpServer;

#[derive(Parser)]
#[command(name = "cardinality-demo")]
#[command(about = "Run one service of the cardinality demo chain", long_about = None)]
struct Cli {
    /// Service role; overrides SERVICE_ROLE and the config file.
    #[arg(short, long)]
    role: Option<ServiceRole>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port; overrides PORT.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref(), cli.role)?;
    if let Some(port) = cli.port {
        config.port = port;
        validate_config(&config).map_err(cardinality_demo::config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        service = %config.service_name(),
        role = %config.role,
        mode = %config.demo_mode,
        upstream = config.upstream_url.as_deref().unwrap_or("-"),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    trigger_on_signal(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
