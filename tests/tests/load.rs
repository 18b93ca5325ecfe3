mod utils;
use utils::*;

use mock_ledger::MockConfig;
use ntest::timeout;
use std::time::Duration;
use txflood::prelude::*;

fn http_pair(config: &BenchConfig, backlog_url: String) -> (HttpSubmitter, HttpBacklog) {
    let client = reqwest::Client::new();
    (
        HttpSubmitter::new(
            client.clone(),
            config.transactions_url(),
            config.accepted_status,
        ),
        HttpBacklog::new(client, backlog_url),
    )
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn every_submission_is_accepted_and_drained() {
    let ledger = fast_ledger().await;
    let config = quick_config(&ledger);
    let (submitter, backlog) = http_pair(&config, ledger.backlog_url());

    let stats = run_load(&config, submitter, backlog).await.unwrap();

    assert!(stats.submitted > 0);
    assert_eq!(stats.accepted, stats.submitted);
    assert_eq!(ledger.accepted(), stats.accepted);
    assert_eq!(ledger.rejected(), 0);
    assert_eq!(stats.failed_workers, 0);
    assert_eq!(ledger.backlog(), 0);
}

#[tracing_test::traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn slow_validation_pauses_submission() {
    let ledger = ledger(MockConfig {
        drain_per_tick: 5,
        tick: Duration::from_millis(50),
        reject_every: None,
    })
    .await;
    let config = BenchConfig {
        burst_size: 200,
        high_water_mark: 100,
        low_water_mark: Some(50),
        ..quick_config(&ledger)
    };
    let (submitter, backlog) = http_pair(&config, ledger.backlog_url());

    let stats = run_load(&config, submitter, backlog).await.unwrap();

    assert!(stats.backlog_pauses >= 1);
    assert_eq!(ledger.accepted(), stats.submitted);
    assert_eq!(ledger.backlog(), 0);
    assert!(logs_contain("txs in backlog"));
    assert!(logs_contain("All done"));
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn rejections_kill_senders() {
    let ledger = ledger(MockConfig {
        reject_every: Some(10),
        ..MockConfig::default()
    })
    .await;
    let config = BenchConfig {
        test_duration: Duration::from_secs(5),
        ..quick_config(&ledger)
    };
    let (submitter, backlog) = http_pair(&config, ledger.backlog_url());

    match run_load(&config, submitter, backlog).await {
        Ok(stats) => {
            assert!(stats.failed_workers > 0);
            assert!(stats.accepted < stats.submitted);
        }
        Err(err) => assert!(matches!(err, BenchError::QueueClosed)),
    }
    assert!(ledger.rejected() > 0);
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn unreachable_backlog_is_an_error() {
    let ledger = fast_ledger().await;
    let config = quick_config(&ledger);
    let (submitter, backlog) = http_pair(&config, format!("{}/nowhere", ledger.base_url()));

    let res = run_load(&config, submitter, backlog).await;
    assert!(matches!(res, Err(BenchError::Backlog(_))));
    assert_eq!(ledger.accepted(), 0);
}
