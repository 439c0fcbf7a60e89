//! Error types for the engine layer.

use std::path::PathBuf;

use c32_blocks::BlockError;
use c32_runtime::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("Unknown function {library}:{function} in catalog")]
    UnknownFunction { library: u8, function: u8 },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for c32-app operations.
pub type AppResult<T> = Result<T, AppError>;
