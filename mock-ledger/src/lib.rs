//! In-process stand-in for the ledger's HTTP API.
//!
//! Accepted transactions land in a backlog which a background task drains at a
//! fixed rate, like a slow validation pipeline would. Drained counts are served
//! back through a graphite-style `/render` endpoint.
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::Deserialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};
use txflood::transaction::Transaction;

/// Backlog endpoint, relative to the base URL.
pub const BACKLOG_PATH: &str = "/api/v1/backlog";

const MAX_TICKS_KEPT: usize = 1_000;

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Transactions removed from the backlog per tick.
    pub drain_per_tick: u64,
    pub tick: Duration,
    /// Answer `500` to every n-th submission.
    pub reject_every: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            drain_per_tick: 1_000,
            tick: Duration::from_millis(100),
            reject_every: None,
        }
    }
}

#[derive(Default)]
struct Ledger {
    backlog: AtomicU64,
    received: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    validated: Mutex<VecDeque<(u64, u64)>>,
}

type SharedLedger = Arc<(MockConfig, Ledger)>;

/// Handle to a running mock ledger.
#[derive(Clone)]
pub struct MockLedger {
    addr: SocketAddr,
    state: SharedLedger,
}

impl MockLedger {
    /// Bind to an ephemeral local port and serve in the background.
    pub async fn spawn(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Self::spawn_on(listener, config)
    }

    pub fn spawn_on(listener: TcpListener, config: MockConfig) -> std::io::Result<Self> {
        let addr = listener.local_addr()?;
        let state = Arc::new((config, Ledger::default()));

        tokio::spawn(drain_task(state.clone()));
        let app = router(state.clone());
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                error!("Mock ledger stopped: {err}");
            }
        });

        Ok(Self { addr, state })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn backlog_url(&self) -> String {
        format!("{}{BACKLOG_PATH}", self.base_url())
    }

    pub fn backlog(&self) -> u64 {
        self.state.1.backlog.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.state.1.received.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.state.1.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.state.1.rejected.load(Ordering::Relaxed)
    }

    /// Sum of everything drained from the backlog so far.
    pub fn validated(&self) -> u64 {
        lock_validated(&self.state.1).iter().map(|(_, n)| n).sum()
    }
}

/// Serve on `addr` until the process ends.
pub async fn run(addr: SocketAddr, config: MockConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    let state = Arc::new((config, Ledger::default()));
    tokio::spawn(drain_task(state.clone()));
    axum::serve(listener, router(state)).await
}

fn router(state: SharedLedger) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/transactions/", post(submit))
        .route(BACKLOG_PATH, get(backlog))
        .route("/render", get(render))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "software": "mock-ledger",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn submit(
    State(state): State<SharedLedger>,
    Json(tx): Json<Transaction>,
) -> impl IntoResponse {
    let (config, ledger) = &*state;
    let received = ledger.received.fetch_add(1, Ordering::Relaxed) + 1;
    counter!("mock-ledger.received").increment(1);

    if let Err(err) = tx.verify() {
        warn!("Rejecting transaction {}: {err}", tx.sequence());
        ledger.rejected.fetch_add(1, Ordering::Relaxed);
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": err.to_string() })),
        );
    }

    if let Some(every) = config.reject_every {
        if every > 0 && received % every == 0 {
            ledger.rejected.fetch_add(1, Ordering::Relaxed);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "message": "injected failure" })),
            );
        }
    }

    ledger.backlog.fetch_add(1, Ordering::Relaxed);
    ledger.accepted.fetch_add(1, Ordering::Relaxed);
    (StatusCode::ACCEPTED, Json(serde_json::json!({ "id": tx.id })))
}

async fn backlog(State(state): State<SharedLedger>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "count": state.1.backlog.load(Ordering::Relaxed) }))
}

#[derive(Deserialize)]
struct RenderQuery {
    target: String,
}

async fn render(State(state): State<SharedLedger>, Query(query): Query<RenderQuery>) -> String {
    lock_validated(&state.1)
        .iter()
        .map(|(ts, n)| format!("{},{ts},{n}\n", query.target))
        .collect()
}

async fn drain_task(state: SharedLedger) {
    let (config, ledger) = &*state;
    let mut interval = tokio::time::interval(config.tick);
    loop {
        interval.tick().await;
        let drained = match ledger
            .backlog
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |b| {
                Some(b.saturating_sub(config.drain_per_tick))
            }) {
            Ok(before) | Err(before) => before.min(config.drain_per_tick),
        };
        if drained == 0 {
            continue;
        }
        debug!("Validated {drained} transactions");

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        record_validated(ledger, ts, drained);
    }
}

/// Append one tick to the history, dropping the oldest past the cap.
fn record_validated(ledger: &Ledger, ts: u64, drained: u64) {
    let mut validated = lock_validated(ledger);
    validated.push_back((ts, drained));
    if validated.len() > MAX_TICKS_KEPT {
        validated.pop_front();
    }
}

fn lock_validated(ledger: &Ledger) -> std::sync::MutexGuard<'_, VecDeque<(u64, u64)>> {
    ledger
        .validated
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use txflood::transaction::TransactionFactory;

    #[tokio::test]
    async fn accepts_signed_and_drains() {
        let ledger = MockLedger::spawn(MockConfig {
            drain_per_tick: 2,
            tick: Duration::from_millis(20),
            reject_every: None,
        })
        .await
        .unwrap();
        let client = reqwest::Client::new();
        let mut factory = TransactionFactory::generate();

        for _ in 0..5 {
            let res = client
                .post(format!("{}/api/v1/transactions/", ledger.base_url()))
                .json(&factory.next_signed().unwrap())
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), reqwest::StatusCode::ACCEPTED);
        }
        assert_eq!(ledger.accepted(), 5);

        while ledger.backlog() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ledger.validated(), 5);

        let count: serde_json::Value = client
            .get(ledger.backlog_url())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(count["count"], 0);
    }

    #[test]
    fn history_keeps_the_latest_ticks() {
        let ledger = Ledger::default();
        for ts in 0..(MAX_TICKS_KEPT as u64 + 5) {
            record_validated(&ledger, ts, 1);
        }

        let validated = lock_validated(&ledger);
        assert_eq!(validated.len(), MAX_TICKS_KEPT);
        assert_eq!(validated.front(), Some(&(5, 1)));
        assert_eq!(validated.back(), Some(&(MAX_TICKS_KEPT as u64 + 4, 1)));
    }

    #[tokio::test]
    async fn rejects_tampered() {
        let ledger = MockLedger::spawn(MockConfig::default()).await.unwrap();
        let mut tx = TransactionFactory::generate().next_signed().unwrap();
        tx.asset.data.n += 1;

        let res = reqwest::Client::new()
            .post(format!("{}/api/v1/transactions/", ledger.base_url()))
            .json(&tx)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(ledger.rejected(), 1);
        assert_eq!(ledger.backlog(), 0);
    }
}
