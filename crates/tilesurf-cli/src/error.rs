//! Error type for the tilesurf CLI.

use thiserror::Error;
use tilesurf_region::RegionError;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Bad configuration or command-line value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Region resolution, assembly or query failed.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// Failed to serialize output.
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// Failed to write output.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Region(RegionError::Cancelled) => 130,
            CliError::Config(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;
