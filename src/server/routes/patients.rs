use super::bad_json;
use crate::server::router::RegistryAppState;
use crate::service::{PatientForm, RegistryState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Fetch before answering instead of returning the current snapshot.
    #[serde(default)]
    pub fresh: bool,
}

/// GET /api/patients
///
/// Answers with the view model state once it has left `loading`, or with the
/// current snapshot if that takes longer than the settle timeout.
pub async fn list_patients(
    State(state): State<RegistryAppState>,
    Query(params): Query<ListParams>,
) -> Json<RegistryState> {
    let registry = state.session.registry();
    if params.fresh {
        registry.refresh().await;
    }
    Json(registry.settled().await)
}

/// POST /api/patients
pub async fn create_patient(
    State(state): State<RegistryAppState>,
    payload: Result<Json<PatientForm>, JsonRejection>,
) -> Response {
    let Json(form) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(&rejection).into_response(),
    };

    match state.session.registry().create(&form).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /api/patients/{id}
pub async fn update_patient(
    State(state): State<RegistryAppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PatientForm>, JsonRejection>,
) -> Response {
    let Json(form) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_json(&rejection).into_response(),
    };

    match state.session.registry().update(id, &form).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/patients/{id}
pub async fn delete_patient(
    State(state): State<RegistryAppState>,
    Path(id): Path<i64>,
) -> Response {
    match state.session.registry().delete(id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}
