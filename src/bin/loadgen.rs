use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use cardinality_demo::config::validation::validate_loadgen_config;
use cardinality_demo::config::{load_loadgen_config, ConfigError, LogFormat, ObservabilityConfig};
use cardinality_demo::lifecycle::{trigger_on_signal, Shutdown};
use cardinality_demo::loadgen::{parse_stages, LoadDriver};
use cardinality_demo::observability::logging;

/// Exit code when the run completed but a threshold was breached.
const THRESHOLD_BREACHED: u8 = 99;

#[derive(Parser)]
#[command(name = "loadgen")]
#[command(about = "Adaptive load generator for the cardinality demo frontend", long_about = None)]
struct Cli {
    /// Frontend base URL; overrides FRONTEND_URL.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Stage schedule, e.g. "30s:10,2m:10,30s:0".
    #[arg(short, long)]
    stages: Option<String>,

    /// Seed for reproducible path generation.
    #[arg(long)]
    seed: Option<u64>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init_logging(&ObservabilityConfig {
        log_level: cli.log_level.clone(),
        log_format: if cli.json { LogFormat::Json } else { LogFormat::Pretty },
        ..ObservabilityConfig::default()
    })?;

    let mut config = load_loadgen_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(stages) = cli.stages.as_deref() {
        config.stages = parse_stages(stages)?;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    validate_loadgen_config(&config).map_err(ConfigError::Validation)?;

    let shutdown = Shutdown::new();
    trigger_on_signal(shutdown.clone());

    let summary = LoadDriver::new(config)?.run(&shutdown).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.thresholds_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("One or more thresholds were breached");
        Ok(ExitCode::from(THRESHOLD_BREACHED))
    }
}
