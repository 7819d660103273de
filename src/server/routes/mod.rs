pub mod console;
pub mod events;
pub mod patients;

use axum::extract::rejection::JsonRejection;
use axum::{Json, http::StatusCode};
use serde_json::json;

/// Uniform 400 for request bodies that are not the expected JSON shape.
pub(super) fn bad_json(rejection: &JsonRejection) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": { "code": "BAD_REQUEST", "message": rejection.body_text() }
        })),
    )
}
