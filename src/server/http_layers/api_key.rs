use super::super::state::ServerState;
use crate::server::error_response;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::debug;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Rejects requests whose `X-API-Key` header doesn't match the operator key.
pub async fn require_operator_key(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == state.config.operator_api_key => next.run(request).await,
        Some(_) => {
            debug!("Rejected request with wrong API key");
            error_response(StatusCode::UNAUTHORIZED, "invalid API key")
        }
        None => {
            debug!("Rejected request without API key");
            error_response(StatusCode::UNAUTHORIZED, "missing API key")
        }
    }
}
