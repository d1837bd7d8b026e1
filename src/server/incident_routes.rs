//! Operator endpoints for managing incidents. All routes sit behind the
//! operator API key layer.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::api_error::{error_response, json_rejection_response, query_rejection_response};
use super::http_layers::require_operator_key;
use super::metrics;
use super::state::{
    GuardedActiveIncidentCache, GuardedCheckRecorder, GuardedIncidentStore, ServerState,
};
use super::ServerConfig;
use crate::incident_store::{Incident, IncidentInput};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Deserialize, Debug, Default)]
struct ListIncidentsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct IncidentStats {
    pub user_count: u64,
    pub window_minutes: u64,
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{}: {:#}", context, err);
    metrics::record_error("store", "incidents");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
}

fn not_found(id: i64) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("incident {} not found", id))
}

fn parse_input(
    body: Result<Json<IncidentInput>, JsonRejection>,
) -> Result<IncidentInput, Response> {
    let Json(input) = body.map_err(json_rejection_response)?;
    input
        .validate()
        .map_err(|message| error_response(StatusCode::BAD_REQUEST, message))?;
    Ok(input)
}

async fn create_incident(
    State(store): State<GuardedIncidentStore>,
    State(cache): State<GuardedActiveIncidentCache>,
    body: Result<Json<IncidentInput>, JsonRejection>,
) -> Response {
    let input = match parse_input(body) {
        Ok(input) => input,
        Err(response) => return response,
    };

    match store.create_incident(&input) {
        Ok(incident) => {
            cache.invalidate();
            info!(
                "Created incident {} ({}) at ({}, {}) r={}m",
                incident.id,
                incident.category,
                incident.latitude,
                incident.longitude,
                incident.radius_meters
            );
            (StatusCode::CREATED, Json(incident)).into_response()
        }
        Err(err) => internal_error("Failed to create incident", err),
    }
}

/// Active listings are served through the short-lived cache; paged listings
/// always hit the store.
async fn list_incidents(
    State(store): State<GuardedIncidentStore>,
    State(cache): State<GuardedActiveIncidentCache>,
    query: Result<Query<ListIncidentsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return query_rejection_response(rejection),
    };

    if query.active == Some(true) {
        if let Some(incidents) = cache.get() {
            return Json(incidents).into_response();
        }
        return match store.list_active_incidents() {
            Ok(incidents) => {
                cache.set(incidents.clone());
                Json(incidents).into_response()
            }
            Err(err) => internal_error("Failed to list active incidents", err),
        };
    }

    let limit = match query.limit {
        Some(0) | None => DEFAULT_PAGE_SIZE,
        Some(limit) => limit.min(MAX_PAGE_SIZE),
    };
    let offset = query.offset.unwrap_or(0);

    match store.list_incidents(limit, offset) {
        Ok(incidents) => Json::<Vec<Incident>>(incidents).into_response(),
        Err(err) => internal_error("Failed to list incidents", err),
    }
}

async fn get_incident(
    State(store): State<GuardedIncidentStore>,
    Path(id): Path<i64>,
) -> Response {
    match store.get_incident(id) {
        Ok(Some(incident)) => Json(incident).into_response(),
        Ok(None) => not_found(id),
        Err(err) => internal_error("Failed to get incident", err),
    }
}

async fn update_incident(
    State(store): State<GuardedIncidentStore>,
    State(cache): State<GuardedActiveIncidentCache>,
    Path(id): Path<i64>,
    body: Result<Json<IncidentInput>, JsonRejection>,
) -> Response {
    let input = match parse_input(body) {
        Ok(input) => input,
        Err(response) => return response,
    };

    match store.update_incident(id, &input) {
        Ok(Some(incident)) => {
            cache.invalidate();
            info!("Updated incident {}", id);
            Json(incident).into_response()
        }
        Ok(None) => not_found(id),
        Err(err) => internal_error("Failed to update incident", err),
    }
}

async fn delete_incident(
    State(store): State<GuardedIncidentStore>,
    State(cache): State<GuardedActiveIncidentCache>,
    Path(id): Path<i64>,
) -> Response {
    match store.deactivate_incident(id) {
        Ok(true) => {
            cache.invalidate();
            info!("Deactivated incident {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => not_found(id),
        Err(err) => internal_error("Failed to deactivate incident", err),
    }
}

async fn get_stats(
    State(config): State<ServerConfig>,
    State(check_store): State<GuardedCheckRecorder>,
) -> Response {
    match check_store.count_danger_users_since(config.stats_window()) {
        Ok(user_count) => Json(IncidentStats {
            user_count,
            window_minutes: config.stats_window_minutes,
        })
        .into_response(),
        Err(err) => internal_error("Failed to compute incident stats", err),
    }
}

pub fn make_incident_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_incidents).post(create_incident))
        .route("/stats", get(get_stats))
        .route(
            "/{id}",
            get(get_incident).put(update_incident).delete(delete_incident),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_operator_key,
        ))
        .with_state(state)
}
