use crate::server::routes::{console, events, patients};
use crate::session::Session;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct RegistryAppState {
    pub session: Session,
}

impl RegistryAppState {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string);

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis();

    // For the SSE route, latency is time-to-first-byte, not stream duration.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    }

    resp
}

pub fn registry_router(state: RegistryAppState) -> Router {
    Router::new()
        .route(
            "/api/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route(
            "/api/patients/{id}",
            put(patients::update_patient).delete(patients::delete_patient),
        )
        .route("/api/sql", post(console::execute_sql))
        .route("/api/sql/history", get(console::sql_history))
        .route("/api/events", get(events::change_events))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
