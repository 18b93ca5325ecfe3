//! Command line and the two execution paths of the benchmark.
//!
//! Without a subcommand the binary runs on the host: it brings up the database,
//! metrics backend and ledger containers, then re-invokes itself inside the ledger
//! container with `load` and the same load options. Afterwards it reads the
//! validated-transaction series back from the metrics backend.
use crate::compose::Compose;
use crate::error::RuntimeError;
use crate::graphite::{GraphiteClient, SeriesSummary};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};
use txflood::prelude::*;
use txflood_core::{BacklogSourceConfig, ComposeConfig};

const DEFAULT_CONTAINER_BINARY: &str = "txflood";

#[derive(Parser, Debug)]
#[command(name = "txflood", version, about = "Ledger transaction throughput benchmark")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Serve Prometheus metrics on this address during the load phase. On the host
    /// path it is forwarded to the ledger container.
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Parse the process arguments, exiting with a usage error on misuse.
    pub fn parse_args() -> Self {
        let cli = Self::parse();
        if let Err(err) = cli.check() {
            err.exit();
        }
        cli
    }

    /// Host options only apply without a subcommand, or after `run`.
    pub fn check(&self) -> Result<(), clap::Error> {
        if self.command.is_some() && self.run != RunArgs::default() {
            return Err(<Self as CommandFactory>::command().error(
                ErrorKind::ArgumentConflict,
                "options before a subcommand are not allowed; pass them after it",
            ));
        }
        Ok(())
    }

    /// Whether this invocation generates load in this process.
    pub fn is_load_phase(&self) -> bool {
        matches!(self.command, Some(Command::Load(_)))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring up the containers and run the load phase inside the ledger container.
    Run(RunArgs),
    /// Generate load against an already running ledger.
    Load(LoadArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunArgs {
    #[command(flatten)]
    pub compose: ComposeArgs,

    #[command(flatten)]
    pub load: LoadArgs,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ComposeArgs {
    /// Orchestration program, e.g. `docker-compose` or `docker compose`.
    #[arg(long)]
    pub compose_program: Option<String>,

    /// Project name namespacing the containers.
    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub database_service: Option<String>,

    #[arg(long)]
    pub metrics_service: Option<String>,

    #[arg(long)]
    pub ledger_service: Option<String>,

    /// Container port of the metrics web interface.
    #[arg(long)]
    pub graphite_port: Option<u16>,

    /// Series to report after the run.
    #[arg(long)]
    pub graphite_target: Option<String>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub graphite_window: Option<Duration>,

    /// Path of this binary inside the ledger container.
    #[arg(long, default_value = DEFAULT_CONTAINER_BINARY)]
    pub container_binary: String,
}

impl Default for ComposeArgs {
    fn default() -> Self {
        Self {
            compose_program: None,
            project: None,
            database_service: None,
            metrics_service: None,
            ledger_service: None,
            graphite_port: None,
            graphite_target: None,
            graphite_window: None,
            container_binary: DEFAULT_CONTAINER_BINARY.to_string(),
        }
    }
}

impl ComposeArgs {
    pub fn to_config(&self) -> ComposeConfig {
        let mut config = ComposeConfig::default();
        if let Some(program) = &self.compose_program {
            config.program = program.clone();
        }
        if let Some(project) = &self.project {
            config.project = project.clone();
        }
        if let Some(service) = &self.database_service {
            config.database_service = service.clone();
        }
        if let Some(service) = &self.metrics_service {
            config.metrics_service = service.clone();
        }
        if let Some(service) = &self.ledger_service {
            config.ledger_service = service.clone();
        }
        if let Some(port) = self.graphite_port {
            config.graphite_port = port;
        }
        if let Some(target) = &self.graphite_target {
            config.graphite_target = target.clone();
        }
        if let Some(window) = self.graphite_window {
            config.graphite_window = window;
        }
        config
    }
}

/// Options of the load phase. Unset options fall back to `--config`, then to the
/// built-in defaults.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct LoadArgs {
    /// JSON file with a full or partial load configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Ledger API root.
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Work queue bound (default: twice the worker count).
    #[arg(long)]
    pub queue_depth: Option<usize>,

    /// Items enqueued per control-loop iteration.
    #[arg(long)]
    pub burst: Option<usize>,

    /// Backlog size above which submission pauses.
    #[arg(long)]
    pub high_water_mark: Option<u64>,

    /// Backlog size at which submission resumes (default: the high-water mark).
    #[arg(long)]
    pub low_water_mark: Option<u64>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub drain_poll_interval: Option<Duration>,

    #[arg(long, value_parser = humantime::parse_duration)]
    pub probe_interval: Option<Duration>,

    /// How long to keep submitting.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Status code that counts as accepted.
    #[arg(long)]
    pub accepted_status: Option<u16>,

    /// Read the backlog from this URL.
    #[arg(long, conflicts_with = "backlog_cmd")]
    pub backlog_url: Option<String>,

    /// Read the backlog from this shell command's output.
    #[arg(long)]
    pub backlog_cmd: Option<String>,
}

impl LoadArgs {
    pub async fn to_config(&self) -> Result<BenchConfig, RuntimeError> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|source| {
                    RuntimeError::ConfigFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                serde_json::from_str(&raw)?
            }
            None => BenchConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut BenchConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(depth) = self.queue_depth {
            config.queue_depth = Some(depth);
        }
        if let Some(burst) = self.burst {
            config.burst_size = burst;
        }
        if let Some(mark) = self.high_water_mark {
            config.high_water_mark = mark;
        }
        if let Some(mark) = self.low_water_mark {
            config.low_water_mark = Some(mark);
        }
        if let Some(interval) = self.poll_interval {
            config.poll_interval = interval;
        }
        if let Some(interval) = self.drain_poll_interval {
            config.drain_poll_interval = interval;
        }
        if let Some(interval) = self.probe_interval {
            config.probe_interval = interval;
        }
        if let Some(duration) = self.duration {
            config.test_duration = duration;
        }
        if let Some(status) = self.accepted_status {
            config.accepted_status = status;
        }
        if let Some(url) = &self.backlog_url {
            config.backlog = BacklogSourceConfig::Http { url: url.clone() };
        }
        if let Some(command) = &self.backlog_cmd {
            config.backlog = BacklogSourceConfig::Command {
                command: command.clone(),
            };
        }
    }

    /// The command line that reproduces these options, for forwarding to `load`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![];
        let mut push = |flag: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value);
            }
        };
        let duration = |d: Option<Duration>| d.map(|d| humantime::format_duration(d).to_string());

        push(
            "--config",
            self.config.as_ref().map(|p| p.display().to_string()),
        );
        push("--base-url", self.base_url.clone());
        push("--workers", self.workers.map(|v| v.to_string()));
        push("--queue-depth", self.queue_depth.map(|v| v.to_string()));
        push("--burst", self.burst.map(|v| v.to_string()));
        push("--high-water-mark", self.high_water_mark.map(|v| v.to_string()));
        push("--low-water-mark", self.low_water_mark.map(|v| v.to_string()));
        push("--poll-interval", duration(self.poll_interval));
        push("--drain-poll-interval", duration(self.drain_poll_interval));
        push("--probe-interval", duration(self.probe_interval));
        push("--duration", duration(self.duration));
        push("--accepted-status", self.accepted_status.map(|v| v.to_string()));
        push("--backlog-url", self.backlog_url.clone());
        push("--backlog-cmd", self.backlog_cmd.clone());
        args
    }
}

/// Entry point for the benchmark binary.
///
/// # Example
///
/// ```ignore
/// #[tokio::main]
/// async fn main() {
///     if let Err(err) = BenchRuntime::new().with_args().run().await {
///         eprintln!("{err}");
///     }
/// }
/// ```
pub struct BenchRuntime {
    command: Command,
    metrics_addr: Option<SocketAddr>,
}

impl Default for BenchRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchRuntime {
    pub fn new() -> Self {
        Self {
            command: Command::Run(RunArgs::default()),
            metrics_addr: None,
        }
    }

    /// Parse the process arguments.
    pub fn with_args(self) -> Self {
        Self::from_cli(Cli::parse_args())
    }

    pub fn from_cli(cli: Cli) -> Self {
        Self {
            command: cli.command.unwrap_or(Command::Run(cli.run)),
            metrics_addr: cli.metrics_addr,
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    /// Exporter address, forwarded to the container on the host path.
    pub fn metrics_addr(mut self, addr: SocketAddr) -> Self {
        self.metrics_addr = Some(addr);
        self
    }

    pub async fn run(self) -> Result<(), RuntimeError> {
        match self.command {
            Command::Run(args) => orchestrate(args, self.metrics_addr).await,
            Command::Load(args) => load(args).await.map(|_| ()),
        }
    }
}

#[instrument(name = "orchestrate", skip_all)]
async fn orchestrate(args: RunArgs, metrics_addr: Option<SocketAddr>) -> Result<(), RuntimeError> {
    let config = args.compose.to_config();
    let compose = Compose::new(&config)?;

    compose.up(&config.database_service).await?;
    compose.up(&config.metrics_service).await?;
    compose.up(&config.ledger_service).await?;

    let graphite_port = compose
        .port(&config.metrics_service, config.graphite_port)
        .await?;
    let graphite_url = format!("http://localhost:{graphite_port}");
    info!("Graphite web interface at: {graphite_url}/");

    let mut exec_args = vec![args.compose.container_binary.clone(), "load".to_string()];
    exec_args.extend(args.load.to_args());
    if let Some(addr) = metrics_addr {
        exec_args.extend(["--metrics-addr".to_string(), addr.to_string()]);
    }
    compose.exec(&config.ledger_service, &exec_args).await?;

    let graphite = GraphiteClient::new(reqwest::Client::new(), graphite_url);
    let points = graphite
        .render(&config.graphite_target, config.graphite_window)
        .await?;
    for point in &points {
        debug!("{} {} {:?}", point.series, point.timestamp, point.value);
    }
    info!(
        "{}: {}",
        config.graphite_target,
        SeriesSummary::from_points(&points)
    );

    Ok(())
}

/// The in-container path: probe the API, then run the throttled load.
#[instrument(name = "load_phase", skip_all)]
pub async fn load(args: LoadArgs) -> Result<RunStatistics, RuntimeError> {
    let config = args.to_config().await?;
    let client = reqwest::Client::builder().build()?;

    wait_for_up(&client, &config.base_url, config.probe_interval).await;

    let submitter = HttpSubmitter::new(
        client.clone(),
        config.transactions_url(),
        config.accepted_status,
    );
    let backlog = ConfiguredBacklog::from_config(&config.backlog, client);

    let stats = run_load(&config, submitter, backlog).await?;
    info!("{stats}");
    Ok(stats)
}
