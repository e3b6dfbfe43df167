//! Buffered asynchronous deletion pipeline.
//!
//! Delete requests are accepted without touching the store. A single
//! background task collects them and hands them to
//! [`LinkRepository::delete_batch`] once per flush interval, so a lookup made
//! right after a delete may still see the link until the next tick.
//!
//! # Flow
//!
//! 1. [`DeletionQueue::enqueue`] pushes a batch into a bounded channel, failing
//!    fast with [`AppError::QueueFull`] when it is saturated
//! 2. The flush loop moves every received batch into its accumulator
//! 3. On each tick a non-empty accumulator is written with one `delete_batch`
//!    call (retried with backoff) and cleared
//! 4. [`DeletionQueue::shutdown`] drains the channel and performs a last flush

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::entities::DeleteRequest;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Default number of batches buffered before `enqueue` is rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default period between flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);

/// Retries after the first failed `delete_batch` call.
const FLUSH_RETRIES: usize = 2;

/// Handle to the deletion pipeline.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) still
/// flushes buffered requests, but nothing waits for it to finish.
pub struct DeletionQueue {
    tx: mpsc::Sender<Vec<DeleteRequest>>,
    worker: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl DeletionQueue {
    /// Spawns the flush loop on the current runtime.
    ///
    /// A `capacity` of 0 is treated as 1.
    pub fn start(
        repo: Arc<dyn LinkRepository>,
        capacity: usize,
        flush_interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = tokio::spawn(run_flush_loop(rx, stop_rx, repo, flush_interval));
        info!(
            capacity,
            interval_ms = flush_interval.as_millis() as u64,
            "Deletion queue started"
        );

        Self {
            tx,
            worker: Mutex::new(Some((stop_tx, handle))),
        }
    }

    /// Hands `requests` to the flush loop without waiting.
    ///
    /// # Errors
    ///
    /// - [`AppError::QueueFull`] when the channel is saturated
    /// - [`AppError::BackendUnavailable`] after [`shutdown`](Self::shutdown)
    pub fn enqueue(&self, requests: Vec<DeleteRequest>) -> Result<(), AppError> {
        if requests.is_empty() {
            return Ok(());
        }

        let count = requests.len();
        match self.tx.try_send(requests) {
            Ok(()) => {
                debug!(count, "Queued delete requests");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                metrics::counter!("shortener_deletion_queue_rejected_total").increment(1);
                warn!(count, "Deletion queue full, rejecting delete requests");
                Err(AppError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(AppError::backend(
                "deletion queue closed",
                "the deletion queue has been shut down",
            )),
        }
    }

    /// Stops accepting requests, flushes everything buffered and waits for
    /// the flush loop to exit.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) {
        let mut worker = self.worker.lock().await;
        let Some((stop, handle)) = worker.take() else {
            return;
        };

        // The loop may already have exited if every sender was dropped.
        let _ = stop.send(());
        if let Err(e) = handle.await {
            error!(error = %e, "Deletion flush loop terminated abnormally");
        }
    }
}

async fn run_flush_loop(
    mut rx: mpsc::Receiver<Vec<DeleteRequest>>,
    mut stop: oneshot::Receiver<()>,
    repo: Arc<dyn LinkRepository>,
    flush_interval: Duration,
) {
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut pending: Vec<DeleteRequest> = Vec::new();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            received = rx.recv() => match received {
                Some(batch) => pending.extend(batch),
                None => break,
            },
            _ = ticker.tick() => flush(repo.as_ref(), &mut pending).await,
        }
    }

    rx.close();
    while let Some(batch) = rx.recv().await {
        pending.extend(batch);
    }
    flush(repo.as_ref(), &mut pending).await;

    info!("Deletion queue stopped");
}

/// Writes and clears `pending`. Empty accumulators are skipped.
///
/// Requests that still fail after the retries are logged and dropped.
async fn flush(repo: &dyn LinkRepository, pending: &mut Vec<DeleteRequest>) {
    if pending.is_empty() {
        return;
    }

    let batch = std::mem::take(pending);
    let count = batch.len();

    let strategy = ExponentialBackoff::from_millis(10)
        .factor(10)
        .max_delay(Duration::from_secs(1))
        .map(jitter)
        .take(FLUSH_RETRIES);

    let result = Retry::spawn(strategy, || {
        let batch = batch.clone();
        async move {
            repo.delete_batch(batch).await.inspect_err(|e| {
                warn!(error = %e, count, "Deletion flush attempt failed");
            })
        }
    })
    .await;

    match result {
        Ok(()) => {
            metrics::counter!("shortener_deletions_flushed_total").increment(count as u64);
            debug!(count, backend = repo.backend_name(), "Flushed delete requests");
        }
        Err(e) => {
            metrics::counter!("shortener_deletion_flush_failures_total").increment(1);
            error!(error = %e, count, "Dropping delete requests after failed flush");
        }
    }
}
