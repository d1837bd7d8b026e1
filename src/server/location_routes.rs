use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use tracing::error;

use super::api_error::{error_response, json_rejection_response};
use super::metrics;
use super::state::{GuardedLocationService, ServerState};
use crate::location::{CheckError, CheckRequest};

async fn check_location(
    State(location_service): State<GuardedLocationService>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejection_response(rejection),
    };

    match location_service.check_location(&request) {
        Ok(response) => Json(response).into_response(),
        Err(CheckError::Validation(message)) => error_response(StatusCode::BAD_REQUEST, message),
        Err(err) => {
            error!("Location check failed: {}", err);
            metrics::record_error("store", "location");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to check location")
        }
    }
}

pub fn make_location_routes(state: ServerState) -> Router {
    Router::new()
        .route("/check", post(check_location))
        .with_state(state)
}
