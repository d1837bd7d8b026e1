//! Asynchronous danger notifications.
//!
//! The producer appends jobs to a durable SQLite queue. A single delivery
//! worker drains it and POSTs each payload to the configured endpoint; failed
//! attempts go through the retry scheduler, which puts them back at the tail
//! of the queue after a linear back-off.

mod models;
mod producer;
mod queue_store;
mod retry_policy;
mod retry_scheduler;
mod schema;
mod sender;
mod worker;

pub use models::{WebhookIncident, WebhookJob, WebhookPayload, DANGER_DETECTED_EVENT};
pub use producer::NotificationProducer;
pub use queue_store::{Dequeued, QueuedJob, SqliteWebhookQueue, WebhookQueue};
pub use retry_policy::{RetryPolicy, DEFAULT_DELAY_STEP, DEFAULT_MAX_RETRIES};
pub use retry_scheduler::{RetryScheduleHandle, RetryScheduler, RetrySink};
pub use sender::{DeliveryError, HttpWebhookSender, WebhookSender, DEFAULT_WEBHOOK_TIMEOUT};
pub use worker::{DeliveryOutcome, DeliveryWorker};
