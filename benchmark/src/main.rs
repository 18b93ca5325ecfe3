use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use txflood_runtime::{BenchRuntime, Cli};

const DEFAULT_FILTER: &str = "txflood=info,txflood_runtime=info";

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    if let Some(addr) = cli.metrics_addr.filter(|_| cli.is_load_phase()) {
        if let Err(err) = PrometheusBuilder::new().with_http_listener(addr).install() {
            error!("Failed to start metrics exporter: {err}");
            std::process::exit(1);
        }
        info!("Serving metrics on http://{addr}/metrics");
    }

    if let Err(err) = BenchRuntime::from_cli(cli).run().await {
        error!("{err}");
        std::process::exit(1);
    }
}
