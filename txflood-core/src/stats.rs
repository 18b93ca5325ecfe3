use std::fmt;
use std::time::Duration;

/// Outcome of one load run.
///
/// `tps` is the submission rate (items handed to the work queue per second of
/// wall-clock time, including the final backlog drain), not the ledger's
/// validation rate; the latter comes from the metrics backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RunStatistics {
    pub worker_count: usize,
    pub submitted: u64,
    pub accepted: u64,
    pub failed_workers: usize,
    pub backlog_pauses: u64,
    pub elapsed: Duration,
    pub tps: f64,
}

impl RunStatistics {
    pub fn new(
        worker_count: usize,
        submitted: u64,
        accepted: u64,
        failed_workers: usize,
        backlog_pauses: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            worker_count,
            submitted,
            accepted,
            failed_workers,
            backlog_pauses,
            elapsed,
            tps: throughput(submitted, elapsed),
        }
    }
}

/// Items per second; zero for an empty interval.
pub fn throughput(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count as f64 / secs
    } else {
        0.
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Submitted={}, Accepted={}, Workers={} ({} failed), Pauses={}, Elapsed={}, TPS={:.2}",
            self.submitted,
            self.accepted,
            self.worker_count,
            self.failed_workers,
            self.backlog_pauses,
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
            self.tps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tps_is_submitted_over_elapsed() {
        let stats = RunStatistics::new(5, 12_345, 12_000, 0, 3, Duration::from_millis(4_321));
        assert!((stats.tps - 12_345. / 4.321).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_is_zero_tps() {
        assert_eq!(throughput(10, Duration::ZERO), 0.);
    }
}
