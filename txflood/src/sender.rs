//! The pool of workers that turn queued sequence numbers into signed submissions.
use crate::transaction::{Transaction, TransactionError, TransactionFactory};
use async_channel::{bounded, Receiver, Sender};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};
#[cfg(feature = "metrics")]
use txflood_core::METRIC_LABELS;

/// What the throttle hands to a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkItem {
    /// Sign and submit the transaction with this sequence number.
    Transaction(u64),
    /// Sentinel: the receiving worker stops.
    Stop,
}

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("Submission failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Expected status {expected}, ledger answered {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Failed to build transaction: {0}")]
    Transaction(#[from] TransactionError),
}

/// The network call a worker makes for every work item.
pub trait Submitter: Send + Sync + 'static {
    fn submit(&self, tx: &Transaction) -> impl Future<Output = Result<(), SenderError>> + Send;
}

/// `POST`s transactions as JSON and insists on one status code.
#[derive(Clone, Debug)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    accepted_status: u16,
}

impl HttpSubmitter {
    pub fn new(client: reqwest::Client, url: impl Into<String>, accepted_status: u16) -> Self {
        Self {
            client,
            url: url.into(),
            accepted_status,
        }
    }
}

impl Submitter for HttpSubmitter {
    async fn submit(&self, tx: &Transaction) -> Result<(), SenderError> {
        let res = self.client.post(&self.url).json(tx).send().await?;
        let actual = res.status().as_u16();
        if actual != self.accepted_status {
            return Err(SenderError::UnexpectedStatus {
                expected: self.accepted_status,
                actual,
            });
        }
        // Drain the body so the connection goes back to the pool.
        res.bytes().await?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub accepted: u64,
    pub failed_workers: usize,
}

/// Fixed set of workers sharing one bounded queue.
pub struct SenderPool {
    queue: Sender<WorkItem>,
    workers: Vec<JoinHandle<Result<u64, SenderError>>>,
}

impl SenderPool {
    /// Spawn `worker_count` workers, each with its own keypair, behind a queue holding
    /// at most `queue_depth` items.
    pub fn spawn<S: Submitter>(worker_count: usize, queue_depth: usize, submitter: S) -> Self {
        let (queue, rx) = bounded(queue_depth);
        let submitter = Arc::new(submitter);

        let workers = (0..worker_count)
            .map(|id| {
                let rx = rx.clone();
                let submitter = submitter.clone();
                let factory = TransactionFactory::generate();
                tokio::spawn(
                    sender_task(rx, submitter, factory)
                        .instrument(tracing::debug_span!("sender", id)),
                )
            })
            .collect();

        Self { queue, workers }
    }

    /// Producer side of the work queue.
    pub fn queue(&self) -> Sender<WorkItem> {
        self.queue.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to finish. Call after each has been sent a sentinel.
    pub async fn join(self) -> PoolReport {
        let mut report = PoolReport::default();
        for handle in self.workers {
            match handle.await {
                Ok(Ok(accepted)) => report.accepted += accepted,
                Ok(Err(err)) => {
                    error!("Sender failed: {err}");
                    report.failed_workers += 1;
                }
                Err(err) => {
                    error!("Sender task panicked: {err}");
                    report.failed_workers += 1;
                }
            }
        }
        report
    }
}

async fn sender_task<S: Submitter>(
    rx: Receiver<WorkItem>,
    submitter: Arc<S>,
    mut factory: TransactionFactory,
) -> Result<u64, SenderError> {
    debug!("Sender started with key {}", factory.public_key());
    let mut accepted = 0;

    while let Ok(item) = rx.recv().await {
        let n = match item {
            WorkItem::Transaction(n) => n,
            WorkItem::Stop => break,
        };

        let tx = factory.sign(n)?;
        let start = Instant::now();
        let res = submitter.submit(&tx).await;

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!(METRIC_LABELS.latency).record(start.elapsed().as_secs_f64());
            match &res {
                Ok(_) => metrics::counter!(METRIC_LABELS.accepted).increment(1),
                Err(_) => metrics::counter!(METRIC_LABELS.rejected).increment(1),
            }
        }
        #[cfg(not(feature = "metrics"))]
        let _ = start;

        res?;
        accepted += 1;
    }

    debug!("Sender stopping after {accepted} transactions");
    Ok(accepted)
}
