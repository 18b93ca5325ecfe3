//! Observers of the ledger's pending-transaction count.
use serde::Deserialize;
use std::future::Future;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
#[allow(unused)]
use tracing::{debug, trace};
use txflood_core::BacklogSourceConfig;

#[derive(Debug, Error)]
pub enum BacklogError {
    #[error("Backlog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backlog command exited with {0}")]
    Command(ExitStatus),

    #[error("Failed to run backlog command: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backlog count is not an integer: {0:?}")]
    Parse(String),
}

/// A pollable source of the backlog size. The only capability the throttle needs.
pub trait BacklogSource: Send + Sync {
    fn count(&self) -> impl Future<Output = Result<u64, BacklogError>> + Send;
}

/// `GET`s a URL answering with a JSON number or `{"count": n}`.
#[derive(Clone, Debug)]
pub struct HttpBacklog {
    client: reqwest::Client,
    url: String,
}

impl HttpBacklog {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BacklogBody {
    Count(u64),
    Object { count: u64 },
}

impl BacklogSource for HttpBacklog {
    async fn count(&self) -> Result<u64, BacklogError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_json_count(&body)
    }
}

fn parse_json_count(body: &str) -> Result<u64, BacklogError> {
    match serde_json::from_str::<BacklogBody>(body.trim()) {
        Ok(BacklogBody::Count(count)) | Ok(BacklogBody::Object { count }) => Ok(count),
        Err(_) => Err(BacklogError::Parse(body.to_string())),
    }
}

/// Runs a shell command and reads the count from the last line of its stdout.
#[derive(Clone, Debug)]
pub struct CommandBacklog {
    command: String,
}

impl CommandBacklog {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl BacklogSource for CommandBacklog {
    async fn count(&self) -> Result<u64, BacklogError> {
        trace!("Running backlog command: {}", self.command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await?;

        if !output.status.success() {
            return Err(BacklogError::Command(output.status));
        }

        parse_last_line(&String::from_utf8_lossy(&output.stdout))
    }
}

// Shell clients tend to print banners before the value.
fn parse_last_line(stdout: &str) -> Result<u64, BacklogError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default();
    line.parse()
        .map_err(|_| BacklogError::Parse(stdout.to_string()))
}

/// Whichever source the configuration selected.
#[derive(Clone, Debug)]
pub enum ConfiguredBacklog {
    Http(HttpBacklog),
    Command(CommandBacklog),
}

impl ConfiguredBacklog {
    pub fn from_config(config: &BacklogSourceConfig, client: reqwest::Client) -> Self {
        match config {
            BacklogSourceConfig::Http { url } => {
                debug!("Reading backlog from {url}");
                ConfiguredBacklog::Http(HttpBacklog::new(client, url.clone()))
            }
            BacklogSourceConfig::Command { command } => {
                debug!("Reading backlog with `{command}`");
                ConfiguredBacklog::Command(CommandBacklog::new(command.clone()))
            }
        }
    }
}

impl BacklogSource for ConfiguredBacklog {
    async fn count(&self) -> Result<u64, BacklogError> {
        match self {
            ConfiguredBacklog::Http(source) => source.count().await,
            ConfiguredBacklog::Command(source) => source.count().await,
        }
    }
}
