use mock_ledger::{MockConfig, MockLedger};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::error;
use txflood::prelude::*;
use txflood_core::BacklogSourceConfig;

/// Process-wide test setup. Logging is left to `traced_test`, which installs the
/// global subscriber itself.
#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));
    });
}

/// A ledger that validates fast enough for short runs to finish promptly.
#[allow(unused)]
pub async fn fast_ledger() -> MockLedger {
    ledger(MockConfig {
        drain_per_tick: 100,
        tick: Duration::from_millis(10),
        reject_every: None,
    })
    .await
}

#[allow(unused)]
pub async fn ledger(config: MockConfig) -> MockLedger {
    init();
    MockLedger::spawn(config).await.unwrap()
}

/// Small, quick run against `ledger`, reading the backlog over HTTP.
#[allow(unused)]
pub fn quick_config(ledger: &MockLedger) -> BenchConfig {
    BenchConfig {
        base_url: ledger.base_url(),
        worker_count: 5,
        burst_size: 50,
        high_water_mark: 200,
        poll_interval: Duration::from_millis(20),
        drain_poll_interval: Duration::from_millis(20),
        probe_interval: Duration::from_millis(20),
        test_duration: Duration::from_millis(500),
        backlog: BacklogSourceConfig::Http {
            url: ledger.backlog_url(),
        },
        ..Default::default()
    }
}
