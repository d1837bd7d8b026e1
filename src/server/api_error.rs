use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// JSON body of every error response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub errors: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            errors: message.into(),
        }),
    )
        .into_response()
}

pub fn json_rejection_response(rejection: JsonRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn query_rejection_response(rejection: QueryRejection) -> Response {
    error_response(StatusCode::BAD_REQUEST, rejection.body_text())
}
