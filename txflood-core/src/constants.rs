use std::time::Duration;

/// Ledger HTTP API used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9984";

/// Path transactions are `POST`ed to, relative to the base URL.
pub const TRANSACTIONS_PATH: &str = "/api/v1/transactions/";

/// The status code the ledger answers with once a transaction is queued.
pub const DEFAULT_ACCEPTED_STATUS: u16 = 202;

pub const DEFAULT_WORKER_COUNT: usize = 20;

/// Items enqueued per control-loop iteration while filling.
pub const DEFAULT_BURST_SIZE: usize = 500;

/// Backlog size above which submission pauses.
pub const DEFAULT_HIGH_WATER_MARK: u64 = 10_000;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TEST_DURATION: Duration = Duration::from_secs(100);

/// Queue slots per worker when no explicit depth is given.
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;

pub const DEFAULT_COMPOSE_PROGRAM: &str = "docker-compose";
pub const DEFAULT_COMPOSE_PROJECT: &str = "bench_create";
pub const DEFAULT_DATABASE_SERVICE: &str = "mdb";
pub const DEFAULT_METRICS_SERVICE: &str = "graphite";
pub const DEFAULT_LEDGER_SERVICE: &str = "bdb";
pub const DEFAULT_GRAPHITE_PORT: u16 = 80;
pub const DEFAULT_GRAPHITE_TARGET: &str = "stats_counts.vote.tx.valid";
pub const DEFAULT_GRAPHITE_WINDOW: Duration = Duration::from_secs(150);

/// Counts the ledger's `backlog` collection from inside the compose network.
pub const DEFAULT_BACKLOG_COMMAND: &str =
    "mongo --quiet --host mdb bigchain --eval 'db.backlog.count()'";
