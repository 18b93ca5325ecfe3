use std::time::Duration;
use tracing::{info, trace};

/// Block until `url` answers at all, retrying every `interval`. Never gives up.
///
/// Any HTTP response counts as up, whatever its status. Returns the number of
/// attempts made.
pub async fn wait_for_up(client: &reqwest::Client, url: &str, interval: Duration) -> u64 {
    info!("Waiting for server to start...");
    let mut attempts = 0;
    loop {
        attempts += 1;
        match client.get(url).send().await {
            Ok(res) => {
                trace!("Readiness probe answered {}", res.status());
                break;
            }
            Err(err) => {
                trace!("Server not up yet: {err}");
                tokio::time::sleep(interval).await;
            }
        }
    }
    info!("Server is up after {attempts} attempt(s)");
    attempts
}
