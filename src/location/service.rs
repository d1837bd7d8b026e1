//! The location check request path: validate, match, record, notify.

use crate::check_store::{CheckRecorder, LocationCheck};
use crate::geo::{match_point, Coordinates, MatchResult};
use crate::incident_store::GeofenceSource;
use crate::server::metrics;
use crate::webhook::NotificationProducer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub user_id: i64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckedIncident {
    pub id: i64,
    pub category: String,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub danger: bool,
    pub incidents: Vec<CheckedIncident>,
}

impl From<&MatchResult> for CheckResponse {
    fn from(result: &MatchResult) -> Self {
        Self {
            danger: result.danger,
            incidents: result
                .matches
                .iter()
                .map(|m| CheckedIncident {
                    id: m.geofence_id,
                    category: m.category.clone(),
                    distance_meters: m.distance_meters,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Failed to read geofences: {0:#}")]
    GeofenceSource(anyhow::Error),
    #[error("Failed to record check: {0:#}")]
    Persistence(anyhow::Error),
}

pub struct LocationService {
    geofences: Arc<dyn GeofenceSource>,
    recorder: Arc<dyn CheckRecorder>,
    producer: NotificationProducer,
}

impl LocationService {
    pub fn new(
        geofences: Arc<dyn GeofenceSource>,
        recorder: Arc<dyn CheckRecorder>,
        producer: NotificationProducer,
    ) -> Self {
        Self {
            geofences,
            recorder,
            producer,
        }
    }

    /// Answers whether the user stands inside any active geofence.
    ///
    /// The check is persisted before answering; if that fails the request
    /// fails too. A dangerous result is handed to the notification producer,
    /// whose failures never reach the caller.
    pub fn check_location(&self, request: &CheckRequest) -> Result<CheckResponse, CheckError> {
        validate(request).inspect_err(|_| metrics::record_location_check("invalid"))?;
        let point = Coordinates::new(request.lat, request.lon);

        let fences = self.geofences.list_active().map_err(|e| {
            error!("Failed to list active geofences: {:#}", e);
            metrics::record_location_check("error");
            CheckError::GeofenceSource(e)
        })?;
        let result = match_point(point, &fences);

        let check = LocationCheck {
            user_id: request.user_id,
            lat: request.lat,
            lon: request.lon,
            danger_detected: result.danger,
            timestamp: chrono::Utc::now(),
        };
        self.recorder.record(&check).map_err(|e| {
            error!("Failed to record location check: {:#}", e);
            metrics::record_location_check("error");
            CheckError::Persistence(e)
        })?;

        debug!(
            "User {} checked at ({}, {}): {} matches",
            request.user_id,
            request.lat,
            request.lon,
            result.matches.len()
        );
        metrics::record_location_check(if result.danger { "danger" } else { "safe" });

        self.producer.produce(&check, &result);

        Ok(CheckResponse::from(&result))
    }
}

fn validate(request: &CheckRequest) -> Result<(), CheckError> {
    if request.user_id <= 0 {
        return Err(CheckError::Validation(
            "user_id must be a positive integer".to_string(),
        ));
    }
    if !Coordinates::new(request.lat, request.lon).is_valid() {
        return Err(CheckError::Validation(
            "lat must be in [-90, 90] and lon in [-180, 180]".to_string(),
        ));
    }
    Ok(())
}
