mod utils;
use utils::*;

use clap::Parser;
use ntest::timeout;
use std::time::Duration;
use txflood::prelude::*;
use txflood_core::BacklogSourceConfig;
use txflood_runtime::graphite::{GraphiteClient, SeriesSummary};
use txflood_runtime::runtime::load;
use txflood_runtime::{BenchRuntime, Cli, LoadArgs};

const TARGET: &str = "stats_counts.vote.tx.valid";

fn load_args(ledger: &mock_ledger::MockLedger) -> LoadArgs {
    LoadArgs {
        base_url: Some(ledger.base_url()),
        workers: Some(4),
        burst: Some(20),
        high_water_mark: Some(200),
        poll_interval: Some(Duration::from_millis(20)),
        drain_poll_interval: Some(Duration::from_millis(20)),
        probe_interval: Some(Duration::from_millis(20)),
        duration: Some(Duration::from_millis(300)),
        backlog_url: Some(ledger.backlog_url()),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn load_phase_against_ledger() {
    let ledger = fast_ledger().await;

    let stats = load(load_args(&ledger)).await.unwrap();

    assert_eq!(stats.worker_count, 4);
    assert!(stats.submitted > 0);
    assert_eq!(stats.accepted, stats.submitted);
    assert_eq!(ledger.accepted(), stats.accepted);
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn config_file_under_flags() {
    let ledger = fast_ledger().await;
    let config = BenchConfig {
        worker_count: 2,
        burst_size: 10,
        backlog: BacklogSourceConfig::Http {
            url: ledger.backlog_url(),
        },
        ..quick_config(&ledger)
    };
    let path = std::env::temp_dir().join(format!("txflood-{}.json", ledger.addr().port()));
    std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

    let args = LoadArgs {
        config: Some(path.clone()),
        workers: Some(3),
        duration: Some(Duration::from_millis(200)),
        ..Default::default()
    };
    let resolved = args.to_config().await.unwrap();
    assert_eq!(resolved.worker_count, 3);
    assert_eq!(resolved.burst_size, 10);
    assert_eq!(resolved.base_url, ledger.base_url());

    let stats = load(args).await.unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(stats.worker_count, 3);
    assert_eq!(ledger.accepted(), stats.accepted);
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn load_subcommand_with_backlog_command() {
    let ledger = fast_ledger().await;
    let url = ledger.base_url();
    let cli = Cli::try_parse_from([
        "txflood",
        "load",
        "--base-url",
        &url,
        "--workers",
        "2",
        "--burst",
        "10",
        "--poll-interval",
        "20ms",
        "--drain-poll-interval",
        "20ms",
        "--duration",
        "200ms",
        "--backlog-cmd",
        "echo 0",
    ])
    .unwrap();

    BenchRuntime::from_cli(cli).run().await.unwrap();

    assert!(ledger.accepted() > 0);
}

#[tokio::test(flavor = "multi_thread")]
#[timeout(30_000)]
async fn validated_series_via_render() {
    let ledger = fast_ledger().await;
    let stats = load(load_args(&ledger)).await.unwrap();

    while ledger.validated() < stats.accepted {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let graphite = GraphiteClient::new(reqwest::Client::new(), ledger.base_url());
    let points = graphite
        .render(TARGET, Duration::from_secs(150))
        .await
        .unwrap();

    assert!(!points.is_empty());
    assert!(points.iter().all(|p| p.series == TARGET));

    let summary = SeriesSummary::from_points(&points);
    assert_eq!(summary.total as u64, stats.accepted);
    assert!(summary.peak <= 100.);
}
