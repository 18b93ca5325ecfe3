use crate::backlog::BacklogSource;
use crate::error::BenchError;
use crate::sender::{SenderPool, Submitter};
use crate::throttle::Throttle;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};
use txflood_core::{BenchConfig, RunStatistics};

/// Drive one load run: spawn the sender pool, feed it through the throttle for
/// `test_duration`, stop every worker, then wait for the ledger's backlog to empty.
///
/// The readiness probe is not part of this; callers wait for the API first.
#[instrument(name = "load", skip_all, fields(workers = config.worker_count))]
pub async fn run_load<S, B>(
    config: &BenchConfig,
    submitter: S,
    backlog: B,
) -> Result<RunStatistics, BenchError>
where
    S: Submitter,
    B: BacklogSource,
{
    config.validate()?;
    info!("Running load with config {:?}", config);

    let start = Instant::now();
    let pool = SenderPool::spawn(config.worker_count, config.queue_depth(), submitter);
    let mut throttle = Throttle::new(config.throttle(), backlog, pool.queue());

    let res = throttle.run(config.test_duration).await;

    // Workers must be released even when the window ended early.
    throttle.stop_workers(pool.worker_count()).await;
    let report = pool.join().await;
    if report.failed_workers > 0 {
        warn!(
            "{} of {} senders failed",
            report.failed_workers, config.worker_count
        );
    }
    res?;

    throttle.wait_for_drain().await?;

    let stats = RunStatistics::new(
        config.worker_count,
        throttle.submitted(),
        report.accepted,
        report.failed_workers,
        throttle.pauses(),
        start.elapsed(),
    );
    info!("Load complete: {stats}");
    Ok(stats)
}
