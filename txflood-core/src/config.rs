use crate::constants::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker_count must be at least 1")]
    NoWorkers,

    #[error("burst_size must be at least 1")]
    EmptyBurst,

    #[error("queue_depth must be at least 1")]
    EmptyQueue,

    #[error("low_water_mark ({low}) is above high_water_mark ({high})")]
    InvertedMarks { low: u64, high: u64 },
}

/// Parameters of a single load run.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub base_url: String,
    pub worker_count: usize,
    /// Bound of the shared work queue. `None` means `2 × worker_count`.
    pub queue_depth: Option<usize>,
    pub burst_size: usize,
    pub high_water_mark: u64,
    /// Backlog size at which a paused run resumes. `None` means `high_water_mark`.
    pub low_water_mark: Option<u64>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub poll_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub drain_poll_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub probe_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub test_duration: Duration,
    pub accepted_status: u16,
    pub backlog: BacklogSourceConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_depth: None,
            burst_size: DEFAULT_BURST_SIZE,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            low_water_mark: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drain_poll_interval: DEFAULT_DRAIN_POLL_INTERVAL,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            test_duration: DEFAULT_TEST_DURATION,
            accepted_status: DEFAULT_ACCEPTED_STATUS,
            backlog: BacklogSourceConfig::default(),
        }
    }
}

impl BenchConfig {
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
            .unwrap_or(self.worker_count * QUEUE_SLOTS_PER_WORKER)
    }

    pub fn low_water_mark(&self) -> u64 {
        self.low_water_mark.unwrap_or(self.high_water_mark)
    }

    pub fn transactions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TRANSACTIONS_PATH)
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            burst_size: self.burst_size,
            high_water_mark: self.high_water_mark,
            low_water_mark: self.low_water_mark(),
            poll_interval: self.poll_interval,
            drain_poll_interval: self.drain_poll_interval,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.burst_size == 0 {
            return Err(ConfigError::EmptyBurst);
        }
        if self.queue_depth() == 0 {
            return Err(ConfigError::EmptyQueue);
        }
        if self.low_water_mark() > self.high_water_mark {
            return Err(ConfigError::InvertedMarks {
                low: self.low_water_mark(),
                high: self.high_water_mark,
            });
        }
        Ok(())
    }
}

/// The subset of [`BenchConfig`] the admission throttle works from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub burst_size: usize,
    pub high_water_mark: u64,
    pub low_water_mark: u64,
    pub poll_interval: Duration,
    pub drain_poll_interval: Duration,
}

/// Where the pending-transaction count is read from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklogSourceConfig {
    /// `GET` returning a JSON number or `{"count": n}`.
    Http { url: String },
    /// Shell command whose stdout is the count.
    Command { command: String },
}

impl Default for BacklogSourceConfig {
    fn default() -> Self {
        BacklogSourceConfig::Command {
            command: DEFAULT_BACKLOG_COMMAND.to_string(),
        }
    }
}

/// Host-side container orchestration settings.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Orchestration program, possibly with leading arguments (`docker compose`).
    pub program: String,
    pub project: String,
    pub database_service: String,
    pub metrics_service: String,
    pub ledger_service: String,
    pub graphite_port: u16,
    pub graphite_target: String,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub graphite_window: Duration,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_COMPOSE_PROGRAM.to_string(),
            project: DEFAULT_COMPOSE_PROJECT.to_string(),
            database_service: DEFAULT_DATABASE_SERVICE.to_string(),
            metrics_service: DEFAULT_METRICS_SERVICE.to_string(),
            ledger_service: DEFAULT_LEDGER_SERVICE.to_string(),
            graphite_port: DEFAULT_GRAPHITE_PORT,
            graphite_target: DEFAULT_GRAPHITE_TARGET.to_string(),
            graphite_window: DEFAULT_GRAPHITE_WINDOW,
        }
    }
}
