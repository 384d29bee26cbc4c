use std::io;

use crate::config::ConfigError;
use crate::orchestrator::OrchestratorError;

/// Fatal errors that end the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize healthcheck orchestrator: {0}")]
    Orchestrator(#[from] OrchestratorError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] io::Error),

    #[error("Invalid log filter: {0}")]
    LogFilter(String),
}
