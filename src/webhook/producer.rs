use super::models::{WebhookIncident, WebhookJob, WebhookPayload, DANGER_DETECTED_EVENT};
use super::queue_store::WebhookQueue;
use crate::check_store::LocationCheck;
use crate::geo::MatchResult;
use crate::server::metrics;
use std::sync::Arc;
use tracing::{debug, error};

/// Turns dangerous check results into queued webhook jobs.
///
/// Enqueueing is best effort: a failure is logged and counted but never
/// reported to the caller, whose check has already been answered.
#[derive(Clone)]
pub struct NotificationProducer {
    queue: Arc<dyn WebhookQueue>,
}

impl NotificationProducer {
    pub fn new(queue: Arc<dyn WebhookQueue>) -> Self {
        Self { queue }
    }

    /// Returns true if a job was enqueued.
    pub fn produce(&self, check: &LocationCheck, result: &MatchResult) -> bool {
        if !result.danger {
            return false;
        }

        let job = WebhookJob::new(WebhookPayload {
            event: DANGER_DETECTED_EVENT.to_string(),
            user_id: check.user_id,
            lat: check.lat,
            lon: check.lon,
            incidents: result.matches.iter().map(WebhookIncident::from).collect(),
            checked_at: check.timestamp,
        });

        match self.queue.enqueue(&job) {
            Ok(()) => {
                debug!("Enqueued danger webhook for user {}", check.user_id);
                metrics::record_webhook_enqueue("ok");
                true
            }
            Err(e) => {
                error!(
                    "Failed to enqueue danger webhook for user {}, notification dropped: {:#}",
                    check.user_id, e
                );
                metrics::record_webhook_enqueue("error");
                false
            }
        }
    }
}
