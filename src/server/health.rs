use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::state::ServerState;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Down,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: BTreeMap<String, HealthStatus>,
    pub timestamp: DateTime<Utc>,
}

fn component_status(name: &str, result: anyhow::Result<()>) -> HealthStatus {
    match result {
        Ok(()) => HealthStatus::Ok,
        Err(e) => {
            warn!("Health check for {} failed: {:#}", name, e);
            HealthStatus::Down
        }
    }
}

pub fn check_health(state: &ServerState) -> HealthResponse {
    let checks: BTreeMap<String, HealthStatus> = [
        ("incidents", component_status("incidents", state.incident_store.ping())),
        ("checks", component_status("checks", state.check_store.ping())),
        (
            "webhook_queue",
            component_status("webhook_queue", state.webhook_queue.ping()),
        ),
    ]
    .into_iter()
    .map(|(name, status)| (name.to_string(), status))
    .collect();

    let status = if checks.values().all(|s| *s == HealthStatus::Ok) {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };

    HealthResponse {
        status,
        checks,
        timestamp: Utc::now(),
    }
}

pub async fn health(State(state): State<ServerState>) -> Response {
    let response = check_health(&state);
    let code = match response.status {
        HealthStatus::Ok => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response)).into_response()
}
