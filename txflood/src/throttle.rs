//! Admission control: feed the work queue in bursts, pause while the ledger's
//! backlog is above the high-water mark.
//!
//! The throttle alternates between two states:
//!
//! * [`ThrottleState::Filling`]: poll the backlog; if it is above the high-water mark
//!   switch to draining without enqueuing, otherwise enqueue one burst.
//! * [`ThrottleState::Draining`]: sleep for the poll interval, poll; once the backlog
//!   is at or under the low-water mark switch back. The burst goes out on the next
//!   tick, so [`Throttle::run`] gets to check its deadline first.
//!
//! Enqueuing blocks whenever the bounded queue is full, so the slower of the ledger
//! and the sender pool sets the pace.
use crate::backlog::BacklogSource;
use crate::error::BenchError;
use crate::meter::RateMeter;
use crate::sender::WorkItem;
use async_channel::Sender;
use std::time::Duration;
use tokio::time::{sleep, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use txflood_core::ThrottleConfig;
#[cfg(feature = "metrics")]
use txflood_core::METRIC_LABELS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleState {
    Filling,
    Draining,
}

pub struct Throttle<B> {
    config: ThrottleConfig,
    backlog: B,
    queue: Sender<WorkItem>,
    state: ThrottleState,
    next_sequence: u64,
    submitted: u64,
    pauses: u64,
    last_backlog: Option<u64>,
    /// The last poll was at or under the low-water mark; fill without polling again.
    resumed: bool,
    meter: RateMeter,
}

impl<B: BacklogSource> Throttle<B> {
    pub fn new(config: ThrottleConfig, backlog: B, queue: Sender<WorkItem>) -> Self {
        Self {
            config,
            backlog,
            queue,
            state: ThrottleState::Filling,
            next_sequence: 0,
            submitted: 0,
            pauses: 0,
            last_backlog: None,
            resumed: false,
            meter: RateMeter::new(),
        }
    }

    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// Work items enqueued so far, sentinels excluded.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// How many times the backlog forced a pause.
    pub fn pauses(&self) -> u64 {
        self.pauses
    }

    pub fn last_backlog(&self) -> Option<u64> {
        self.last_backlog
    }

    /// One step of the state machine. Returns the state it ends in.
    pub async fn tick(&mut self) -> Result<ThrottleState, BenchError> {
        match self.state {
            ThrottleState::Filling if self.resumed => {
                self.resumed = false;
                self.fill().await?;
            }
            ThrottleState::Filling => {
                let backlog = self.poll().await?;
                if backlog > self.config.high_water_mark {
                    debug!(
                        "Backlog {backlog} above {}; pausing",
                        self.config.high_water_mark
                    );
                    self.state = ThrottleState::Draining;
                    self.pauses += 1;
                } else {
                    self.fill().await?;
                }
            }
            ThrottleState::Draining => {
                sleep(self.config.poll_interval).await;
                let backlog = self.poll().await?;
                if backlog <= self.config.low_water_mark {
                    debug!("Backlog down to {backlog}; resuming");
                    self.state = ThrottleState::Filling;
                    self.resumed = true;
                }
            }
        }
        Ok(self.state)
    }

    /// Keep ticking until `duration` has passed.
    pub async fn run(&mut self, duration: Duration) -> Result<(), BenchError> {
        let start = Instant::now();
        while start.elapsed() < duration {
            self.tick().await?;
        }
        info!(
            "Submission window closed after {} transactions ({} pauses, last {})",
            self.submitted, self.pauses, self.meter
        );
        Ok(())
    }

    /// Enqueue one sentinel per worker.
    ///
    /// A closed queue means every worker has already gone, which is not an error here.
    pub async fn stop_workers(&mut self, worker_count: usize) {
        for _ in 0..worker_count {
            if self.queue.send(WorkItem::Stop).await.is_err() {
                warn!("Work queue closed before every sender was stopped");
                return;
            }
        }
        debug!("Sent {worker_count} sentinels");
    }

    /// Poll until the ledger has worked through its backlog.
    pub async fn wait_for_drain(&mut self) -> Result<(), BenchError> {
        loop {
            let backlog = self.poll().await?;
            if backlog == 0 {
                break;
            }
            info!("{backlog} txs in backlog");
            sleep(self.config.drain_poll_interval).await;
        }
        info!("All done");
        Ok(())
    }

    async fn poll(&mut self) -> Result<u64, BenchError> {
        let backlog = self.backlog.count().await?;
        trace!("Backlog: {backlog}");
        self.last_backlog = Some(backlog);

        #[cfg(feature = "metrics")]
        metrics::gauge!(METRIC_LABELS.backlog).set(backlog as f64);

        Ok(backlog)
    }

    async fn fill(&mut self) -> Result<(), BenchError> {
        for _ in 0..self.config.burst_size {
            self.queue
                .send(WorkItem::Transaction(self.next_sequence))
                .await
                .map_err(|_| BenchError::QueueClosed)?;
            self.next_sequence += 1;
            self.submitted += 1;
            self.meter.tick();

            #[cfg(feature = "metrics")]
            metrics::counter!(METRIC_LABELS.submitted).increment(1);
        }
        trace!("Burst done; {} submitted", self.submitted);
        Ok(())
    }
}
