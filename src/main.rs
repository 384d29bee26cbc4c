//! healthcheck: probe health endpoints and ping a monitor on success.
//!
//! This is the application entry point. It initializes tracing, loads the probe
//! list from the optional TOML file and `HEALTHCHECK_SCRAPERS`, starts the
//! orchestrator and stops it again on SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use healthcheck::config::{AppConfig, DEFAULT_LOG_FILTER};
use healthcheck::shutdown::wait_for_signal;
use healthcheck::{AppError, Notifier, Orchestrator, ProbeRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Probe health endpoints and ping a monitoring URL on success
#[derive(Parser, Debug)]
#[command(name = "healthcheck", version, about)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "healthcheck=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format (overrides [logging] format in the config file)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // The format may come from the config file, so read it before tracing is up
    let config = AppConfig::load(args.config.as_deref());
    let format = args.log_format.unwrap_or_else(|| match &config {
        Ok(config) if config.logging.format.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_tracing(args.log_level, format)?;

    let config = config.map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;
    tracing::info!(
        probe_count = config.scraper.len(),
        config = ?config,
        "Loaded configuration"
    );

    if config.scraper.is_empty() {
        tracing::warn!("No scrapers configured - application will exit");
        return Ok(());
    }

    let mut orchestrator = Orchestrator::new(ProbeRegistry::default(), Notifier::new()?);
    orchestrator.initialize(&config.scraper)?;
    orchestrator.start()?;

    let signal = match wait_for_signal().await {
        Ok(signal) => signal,
        Err(e) => {
            orchestrator.stop().await;
            return Err(e.into());
        }
    };
    tracing::info!(signal = %signal, "Received shutdown signal");

    orchestrator.stop().await;
    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Initialize tracing with filter priority: CLI > env > default
fn init_tracing(log_level: Option<String>, format: LogFormat) -> Result<(), AppError> {
    let log_filter = log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let filter =
        EnvFilter::try_new(&log_filter).map_err(|e| AppError::LogFilter(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    Ok(())
}
