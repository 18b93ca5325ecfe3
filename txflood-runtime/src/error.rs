use crate::compose::ComposeError;
use crate::graphite::GraphiteError;
use std::path::PathBuf;
use thiserror::Error;
use txflood::BenchError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Orchestration failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("Metrics query failed: {0}")]
    Graphite(#[from] GraphiteError),

    #[error("Load run failed: {0}")]
    Bench(#[from] BenchError),

    #[error("Failed to read config file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
