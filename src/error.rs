use crate::config::ConfigError;
use crate::link::LinkError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Errors that end the exporter.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serial link error: {0}")]
    Link(#[from] LinkError),

    #[error("Supervisor task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
