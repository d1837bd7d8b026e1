//! The single consumer that drains the webhook queue.

use super::queue_store::{Dequeued, QueuedJob, WebhookQueue};
use super::retry_policy::RetryPolicy;
use super::retry_scheduler::RetrySink;
use super::sender::WebhookSender;
use crate::server::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Back-off after the queue itself fails, so a broken database does not spin.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    RetryScheduled { retry_count: u32, delay: Duration },
    PermanentlyFailed,
    /// The retry could not be handed off; the row stays claimed and is
    /// redelivered when the queue is next opened.
    LeftInQueue,
}

pub struct DeliveryWorker {
    queue: Arc<dyn WebhookQueue>,
    sender: Arc<dyn WebhookSender>,
    retries: Arc<dyn RetrySink>,
    policy: RetryPolicy,
}

impl DeliveryWorker {
    pub fn new(
        queue: Arc<dyn WebhookQueue>,
        sender: Arc<dyn WebhookSender>,
        retries: Arc<dyn RetrySink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            sender,
            retries,
            policy,
        }
    }

    /// Processes jobs one at a time until `shutdown_token` fires.
    ///
    /// A delivery already in progress is allowed to finish; cancellation is
    /// only observed while waiting for the next job.
    pub async fn run(&self, shutdown_token: CancellationToken) {
        info!(
            "Starting webhook delivery worker (max retries: {})",
            self.policy.max_retries
        );

        loop {
            match self.queue.dequeue_blocking(&shutdown_token).await {
                Ok(Dequeued::Job(queued)) => {
                    self.process(queued).await;
                }
                Ok(Dequeued::Cancelled) => break,
                Err(e) => {
                    error!("Failed to dequeue webhook job: {:#}", e);
                    tokio::select! {
                        _ = shutdown_token.cancelled() => break,
                        _ = tokio::time::sleep(QUEUE_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Webhook delivery worker stopped");
    }

    /// Makes one delivery attempt for a claimed job, then acks it.
    pub async fn process(&self, queued: QueuedJob) -> DeliveryOutcome {
        let QueuedJob { id, mut job } = queued;
        let user_id = job.payload.user_id;
        let started = Instant::now();

        let outcome = match self.sender.send(&job.payload).await {
            Ok(()) => {
                info!(
                    "Delivered danger webhook for user {} (attempt {})",
                    user_id,
                    job.retry_count + 1
                );
                DeliveryOutcome::Delivered
            }
            Err(err) if self.policy.should_retry(job.retry_count) => {
                job.retry_count += 1;
                let delay = self.policy.delay_for(job.retry_count);
                warn!(
                    "Webhook delivery for user {} failed: {}. Retry {}/{} in {:?}",
                    user_id, err, job.retry_count, self.policy.max_retries, delay
                );
                let retry_count = job.retry_count;
                match self.retries.schedule(job, delay) {
                    Ok(()) => DeliveryOutcome::RetryScheduled { retry_count, delay },
                    Err(e) => {
                        warn!(
                            "Could not schedule retry for webhook job {}, leaving it queued: {:#}",
                            id, e
                        );
                        DeliveryOutcome::LeftInQueue
                    }
                }
            }
            Err(err) => {
                error!(
                    "Webhook delivery for user {} permanently failed after {} retries: {}",
                    user_id, job.retry_count, err
                );
                DeliveryOutcome::PermanentlyFailed
            }
        };

        metrics::record_webhook_delivery(outcome.metric_label(), started.elapsed());

        if outcome == DeliveryOutcome::LeftInQueue {
            return outcome;
        }

        // A retry is already a new queue entry, so the claimed row goes either way
        if let Err(e) = self.queue.ack(id) {
            error!("Failed to ack webhook job {}: {:#}", id, e);
        }

        outcome
    }
}

impl DeliveryOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::RetryScheduled { .. } => "retry_scheduled",
            DeliveryOutcome::PermanentlyFailed => "permanently_failed",
            DeliveryOutcome::LeftInQueue => "left_in_queue",
        }
    }
}
