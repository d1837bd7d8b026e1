use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record that a user's position was checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCheck {
    pub user_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub danger_detected: bool,
    pub timestamp: DateTime<Utc>,
}
