//! Delayed re-enqueue of failed webhook jobs.
//!
//! One loop owns a min-heap of pending retries keyed by fire time and sleeps
//! until the earliest one is due. Retries still waiting when shutdown is
//! signalled are dropped; the durable queue is what survives restarts.

use super::models::WebhookJob;
use super::queue_store::WebhookQueue;
use crate::server::metrics;
use anyhow::{anyhow, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Accepts jobs to be re-enqueued after a delay. Never blocks.
pub trait RetrySink: Send + Sync {
    /// Fails when the job can no longer be re-enqueued, e.g. the scheduler has stopped.
    fn schedule(&self, job: WebhookJob, delay: Duration) -> Result<()>;
}

struct RetryRequest {
    job: WebhookJob,
    delay: Duration,
}

/// Cheap handle used by the delivery worker to submit retries.
#[derive(Clone)]
pub struct RetryScheduleHandle {
    sender: mpsc::UnboundedSender<RetryRequest>,
}

impl RetrySink for RetryScheduleHandle {
    fn schedule(&self, job: WebhookJob, delay: Duration) -> Result<()> {
        self.sender
            .send(RetryRequest { job, delay })
            .map_err(|_| anyhow!("Retry scheduler is not running"))
    }
}

struct PendingRetry {
    fire_at: Instant,
    seq: u64,
    job: WebhookJob,
}

// Reversed so BinaryHeap pops the earliest fire time first.
impl Ord for PendingRetry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingRetry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingRetry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for PendingRetry {}

pub struct RetryScheduler {
    queue: Arc<dyn WebhookQueue>,
    receiver: mpsc::UnboundedReceiver<RetryRequest>,
    pending: BinaryHeap<PendingRetry>,
    next_seq: u64,
    shutdown_token: CancellationToken,
}

impl RetryScheduler {
    pub fn new(
        queue: Arc<dyn WebhookQueue>,
        shutdown_token: CancellationToken,
    ) -> (Self, RetryScheduleHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            queue,
            receiver,
            pending: BinaryHeap::new(),
            next_seq: 0,
            shutdown_token,
        };
        (scheduler, RetryScheduleHandle { sender })
    }

    pub async fn run(mut self) {
        info!("Starting webhook retry scheduler");

        loop {
            let next_fire_at = self.pending.peek().map(|p| p.fire_at);

            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => {
                    if !self.pending.is_empty() {
                        warn!(
                            "Retry scheduler shutting down, abandoning {} pending retries",
                            self.pending.len()
                        );
                    }
                    break;
                }
                Some(request) = self.receiver.recv() => {
                    self.push(request);
                }
                _ = sleep_until_or_forever(next_fire_at) => {
                    self.fire_due();
                }
            }
        }

        metrics::set_pending_retries(0);
        info!("Webhook retry scheduler stopped");
    }

    fn push(&mut self, request: RetryRequest) {
        let fire_at = Instant::now() + request.delay;
        debug!(
            "Scheduling retry {} for user {} in {:?}",
            request.job.retry_count, request.job.payload.user_id, request.delay
        );
        self.pending.push(PendingRetry {
            fire_at,
            seq: self.next_seq,
            job: request.job,
        });
        self.next_seq += 1;
        metrics::set_pending_retries(self.pending.len());
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        while self.pending.peek().is_some_and(|p| p.fire_at <= now) {
            let Some(due) = self.pending.pop() else {
                break;
            };
            match self.queue.enqueue(&due.job) {
                Ok(()) => debug!(
                    "Re-enqueued webhook job for user {} (retry {})",
                    due.job.payload.user_id, due.job.retry_count
                ),
                Err(e) => error!(
                    "Failed to re-enqueue webhook job for user {} (retry {}), notification lost: {:#}",
                    due.job.payload.user_id, due.job.retry_count, e
                ),
            }
        }
        metrics::set_pending_retries(self.pending.len());
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
