//! Durable webhook job queue.
//!
//! Jobs are appended at the tail and claimed from the head. A claimed job is
//! marked `in_flight` and only deleted once acknowledged, so a crash between
//! claim and ack leaves the job on disk; it is put back on the queue the next
//! time the database is opened.

use super::models::WebhookJob;
use super::schema::WEBHOOK_QUEUE_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Upper bound on how long an idle consumer waits before looking at the
/// table again, in case a wakeup was missed.
const IDLE_RECHECK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueueItemStatus {
    Pending,
    InFlight,
}

impl QueueItemStatus {
    fn as_str(&self) -> &'static str {
        match self {
            QueueItemStatus::Pending => "pending",
            QueueItemStatus::InFlight => "in_flight",
        }
    }
}

/// A job claimed from the queue, identified for acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: i64,
    pub job: WebhookJob,
}

#[derive(Debug, PartialEq)]
pub enum Dequeued {
    Job(QueuedJob),
    Cancelled,
}

#[async_trait]
pub trait WebhookQueue: Send + Sync {
    /// Appends `job` to the tail and wakes a waiting consumer.
    fn enqueue(&self, job: &WebhookJob) -> Result<()>;

    /// Waits for the job at the head, or for `cancel` to fire.
    async fn dequeue_blocking(&self, cancel: &CancellationToken) -> Result<Dequeued>;

    /// Removes a claimed job for good.
    fn ack(&self, id: i64) -> Result<()>;

    /// Jobs waiting to be claimed.
    fn pending_count(&self) -> Result<usize>;

    fn ping(&self) -> Result<()>;
}

pub struct SqliteWebhookQueue {
    conn: Arc<Mutex<Connection>>,
    notify: Notify,
}

impl SqliteWebhookQueue {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(
            db_path.as_ref(),
            WEBHOOK_QUEUE_VERSIONED_SCHEMAS,
            "webhook queue",
        )?;
        let recovered = Self::requeue_in_flight(&conn)?;
        if recovered > 0 {
            info!(
                "Returned {} in-flight webhook jobs from a previous run to the queue",
                recovered
            );
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notify: Notify::new(),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        WEBHOOK_QUEUE_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            notify: Notify::new(),
        })
    }

    fn requeue_in_flight(conn: &Connection) -> Result<usize> {
        let count = conn.execute(
            "UPDATE webhook_queue SET status = ?1 WHERE status = ?2",
            params![
                QueueItemStatus::Pending.as_str(),
                QueueItemStatus::InFlight.as_str()
            ],
        )?;
        Ok(count)
    }

    /// Claims the oldest pending job, dropping rows that cannot be decoded.
    fn try_claim(&self) -> Result<Option<QueuedJob>> {
        let mut conn = self.conn.lock().unwrap();
        loop {
            let tx = conn.transaction()?;
            let head = tx
                .query_row(
                    "SELECT id, payload FROM webhook_queue WHERE status = ?1 ORDER BY id LIMIT 1",
                    params![QueueItemStatus::Pending.as_str()],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            let Some((id, payload)) = head else {
                return Ok(None);
            };

            match serde_json::from_str::<WebhookJob>(&payload) {
                Ok(job) => {
                    tx.execute(
                        "UPDATE webhook_queue SET status = ?1 WHERE id = ?2",
                        params![QueueItemStatus::InFlight.as_str(), id],
                    )?;
                    tx.commit()?;
                    return Ok(Some(QueuedJob { id, job }));
                }
                Err(e) => {
                    warn!("Dropping undecodable webhook job {}: {}", id, e);
                    tx.execute("DELETE FROM webhook_queue WHERE id = ?1", params![id])?;
                    tx.commit()?;
                }
            }
        }
    }

    #[cfg(test)]
    fn insert_raw_payload(&self, payload: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO webhook_queue (payload, status) VALUES (?1, ?2)",
            params![payload, QueueItemStatus::Pending.as_str()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl WebhookQueue for SqliteWebhookQueue {
    fn enqueue(&self, job: &WebhookJob) -> Result<()> {
        let payload = serde_json::to_string(job).context("Failed to encode webhook job")?;
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO webhook_queue (payload, status) VALUES (?1, ?2)",
                params![payload, QueueItemStatus::Pending.as_str()],
            )
            .context("Failed to enqueue webhook job")?;
        }
        // Stores a permit when nobody is waiting yet
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue_blocking(&self, cancel: &CancellationToken) -> Result<Dequeued> {
        loop {
            if cancel.is_cancelled() {
                return Ok(Dequeued::Cancelled);
            }
            if let Some(queued) = self.try_claim()? {
                return Ok(Dequeued::Job(queued));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Dequeued::Cancelled),
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(IDLE_RECHECK_INTERVAL) => {}
            }
        }
    }

    fn ack(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM webhook_queue WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to ack webhook job {}", id))?;
        Ok(())
    }

    fn pending_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM webhook_queue WHERE status = ?1",
            params![QueueItemStatus::Pending.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .context("Webhook queue database unreachable")
    }
}
