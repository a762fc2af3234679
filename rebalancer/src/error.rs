//! Error types for the cycle runner.

use std::path::PathBuf;

/// All errors that can occur while running a cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("cycle file error: {0}")]
    Cycle(String),

    #[error("failed to read cycle file {path}: {source}")]
    CycleRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse cycle JSON: {0}")]
    CycleParse(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] weightbook::Error),

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
