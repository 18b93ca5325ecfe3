mod utils;
use utils::*;

use mock_ledger::{MockConfig, MockLedger};
use ntest::timeout;
use std::time::Duration;
use tokio::net::TcpListener;
use txflood::prelude::*;

#[tokio::test(flavor = "multi_thread")]
#[timeout(10_000)]
async fn waits_for_late_server() {
    init();
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();

    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        let listener = TcpListener::bind(addr).await.unwrap();
        MockLedger::spawn_on(listener, MockConfig::default()).unwrap()
    });

    let client = reqwest::Client::new();
    let attempts = wait_for_up(
        &client,
        &format!("http://{addr}/"),
        Duration::from_millis(20),
    )
    .await;

    assert!(attempts > 1);
    let ledger = server.await.unwrap();
    assert_eq!(ledger.addr(), addr);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn running_server_is_up_at_once() {
    let ledger = fast_ledger().await;
    let client = reqwest::Client::new();
    let attempts = wait_for_up(&client, &ledger.base_url(), Duration::from_secs(1)).await;

    assert_eq!(attempts, 1);
    assert!(logs_contain("Waiting for server to start..."));
    assert!(logs_contain("Server is up after 1 attempt(s)"));
}
