use std::path::PathBuf;
use thiserror::Error;
use trjconv::engine::error::EngineError;

pub type Result<T> = std::result::Result<T, CliError>;

/// Everything that can stop a `tinker-trjconv` command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config file '{path}': {source}", path = path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Imaging backend unavailable: {0}")]
    Backend(String),

    #[error("Could not back up existing output '{path}': {source}", path = path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input and output are the same file: {}", .0.display())]
    SameFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
