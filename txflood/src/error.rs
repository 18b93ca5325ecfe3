use crate::backlog::BacklogError;
use thiserror::Error;
use txflood_core::ConfigError;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read backlog: {0}")]
    Backlog(#[from] BacklogError),

    #[error("Work queue closed; every sender has stopped")]
    QueueClosed,
}
