use super::bad_json;
use crate::server::router::RegistryAppState;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    #[serde(default)]
    pub sql: String,
}

/// POST /api/sql
///
/// Raw console text goes straight to the executor; engine errors come back verbatim.
pub async fn execute_sql(
    State(state): State<RegistryAppState>,
    payload: Result<Json<SqlRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(&rejection).into_response(),
    };

    let mut console = state.session.console().lock().await;
    match console.execute_text(req.sql).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/sql/history
pub async fn sql_history(State(state): State<RegistryAppState>) -> Response {
    let console = state.session.console().lock().await;
    Json(json!({ "entries": console.history().iter().collect::<Vec<_>>() })).into_response()
}
