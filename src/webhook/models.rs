use crate::geo::NearbyMatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DANGER_DETECTED_EVENT: &str = "danger_detected";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookIncident {
    pub id: i64,
    pub category: String,
    pub distance_meters: f64,
}

impl From<&NearbyMatch> for WebhookIncident {
    fn from(m: &NearbyMatch) -> Self {
        Self {
            id: m.geofence_id,
            category: m.category.clone(),
            distance_meters: m.distance_meters,
        }
    }
}

/// Body POSTed to the webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub user_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub incidents: Vec<WebhookIncident>,
    pub checked_at: DateTime<Utc>,
}

/// Queue wire format: the payload plus its delivery bookkeeping.
///
/// Unknown fields are ignored when decoding so older workers can read jobs
/// written by newer producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookJob {
    #[serde(flatten)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub retry_count: u32,
}

impl WebhookJob {
    pub fn new(payload: WebhookPayload) -> Self {
        Self {
            payload,
            retry_count: 0,
        }
    }
}
