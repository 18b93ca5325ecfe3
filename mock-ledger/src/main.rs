use mock_ledger::MockConfig;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_ledger=info,tower_http=warn")),
        )
        .init();

    let addr = SocketAddr::from(([0, 0, 0, 0], 9984));
    info!("Mock ledger listening on {addr}");
    if let Err(err) = mock_ledger::run(addr, MockConfig::default()).await {
        error!("Mock ledger failed: {err}");
        std::process::exit(1);
    }
}
