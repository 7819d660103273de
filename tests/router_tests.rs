mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::{TempDb, WAIT};
use futures::StreamExt;
use std::time::Duration;
use patient_registry::Session;
use patient_registry::server::router::{RegistryAppState, registry_router};
use patient_registry::sync::ChannelHub;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let resp = app
        .clone()
        .oneshot(builder.body(body).expect("failed to build request"))
        .await
        .expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is not JSON")
    };
    (status, json)
}

#[tokio::test]
async fn patient_routes_cover_the_registry_lifecycle() {
    let tmp = TempDb::new("router-patients");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    let app = registry_router(RegistryAppState::new(session.clone()));

    // 1) empty registry
    let (status, body) = send(&app, "GET", "/api/patients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ready", "patients": [] }));

    // 2) register
    let (status, body) = send(
        &app,
        "POST",
        "/api/patients",
        Some(json!({ "name": "Alice", "age": 30, "gender": "Female", "ailment": "Flu" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "id": 1 }));

    let (_, body) = send(&app, "GET", "/api/patients?fresh=true", None).await;
    assert_eq!(body["patients"][0]["name"], "Alice");
    assert_eq!(body["patients"][0]["age"], 30);

    // 3) update
    let (status, body) = send(
        &app,
        "PUT",
        "/api/patients/1",
        Some(json!({ "name": "Alice", "age": "31", "gender": "Female", "ailment": "Cold" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 1);

    let (_, body) = send(&app, "GET", "/api/patients?fresh=true", None).await;
    assert_eq!(body["patients"][0]["age"], 31);
    assert_eq!(body["patients"][0]["ailment"], "Cold");

    // 4) delete, twice
    let (status, body) = send(&app, "DELETE", "/api/patients/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 1);
    let (status, body) = send(&app, "DELETE", "/api/patients/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_affected"], 0);

    let (_, body) = send(&app, "GET", "/api/patients?fresh=true", None).await;
    assert_eq!(body["patients"], json!([]));

    session.close().await;
}

#[tokio::test]
async fn patient_routes_reject_bad_input() {
    let tmp = TempDb::new("router-reject");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    let app = registry_router(RegistryAppState::new(session.clone()));

    // 1) invalid age -> 422
    let (status, body) = send(
        &app,
        "POST",
        "/api/patients",
        Some(json!({ "name": "Bob", "age": "abc", "gender": "Male", "ailment": "Cold" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // 2) missing field -> 422
    let (status, _) = send(
        &app,
        "POST",
        "/api/patients",
        Some(json!({ "name": "Bob", "age": 3, "gender": "Male" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // 3) not JSON -> 400
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patients")
                .header("content-type", "application/json")
                .body(Body::from("not-json"))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 4) unknown route -> 404
    let (status, _) = send(&app, "GET", "/api/doctors", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/patients?fresh=true", None).await;
    assert_eq!(body["patients"], json!([]));

    session.close().await;
}

#[tokio::test]
async fn sql_routes_return_rows_errors_and_history() {
    let tmp = TempDb::new("router-sql");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    let app = registry_router(RegistryAppState::new(session.clone()));

    let (status, body) = send(
        &app,
        "POST",
        "/api/sql",
        Some(json!({ "sql": "INSERT INTO patients (name, age, gender, ailment) VALUES ('Eve', 22, 'F', 'Migraine')" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "mutating");
    assert_eq!(body["rows"], json!([]));

    let (status, body) = send(
        &app,
        "POST",
        "/api/sql",
        Some(json!({ "sql": "SELECT name, age FROM patients" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([{ "name": "Eve", "age": 22 }]));

    let (status, body) = send(&app, "POST", "/api/sql", Some(json!({ "sql": "SELEC 1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "QUERY_ERROR");
    assert!(
        body["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("syntax error"))
    );

    let (status, body) = send(&app, "POST", "/api/sql", Some(json!({ "sql": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "EMPTY_QUERY");

    let (status, body) = send(&app, "GET", "/api/sql/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["entries"],
        json!([
            "SELEC 1",
            "SELECT name, age FROM patients",
            "INSERT INTO patients (name, age, gender, ailment) VALUES ('Eve', 22, 'F', 'Migraine')"
        ])
    );

    session.close().await;
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let tmp = TempDb::new("router-request-id");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    let app = registry_router(RegistryAppState::new(session.clone()));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sql/history")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/sql/history")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert!(resp.headers().contains_key("x-request-id"));

    session.close().await;
}

#[tokio::test]
async fn change_events_stream_reports_writes_only() {
    let tmp = TempDb::new("router-events");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    let app = registry_router(RegistryAppState::new(session.clone()));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"))
    );
    let mut frames = resp.into_body().into_data_stream();

    // 1) a write through the router shows up as one change frame
    let (status, _) = send(
        &app,
        "POST",
        "/api/patients",
        Some(json!({ "name": "Zoe", "age": 30.0, "gender": "F", "ailment": "Flu" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let chunk = tokio::time::timeout(WAIT, frames.next())
        .await
        .expect("no change frame arrived")
        .expect("event stream ended")
        .expect("event stream failed");
    let frame = String::from_utf8_lossy(&chunk);
    assert!(frame.contains("event: change"), "unexpected frame: {frame}");
    assert!(frame.contains("data: data-updated"), "unexpected frame: {frame}");

    // 2) a read-only console query produces nothing
    let (status, body) = send(
        &app,
        "POST",
        "/api/sql",
        Some(json!({ "sql": "SELECT age FROM patients" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([{ "age": 30 }]));
    assert!(
        tokio::time::timeout(Duration::from_millis(300), frames.next())
            .await
            .is_err(),
        "read-only query must not announce"
    );

    session.close().await;
}

#[tokio::test]
async fn patient_list_answers_after_unmount() {
    let tmp = TempDb::new("router-unmounted");
    let session = Session::open(&tmp.config(), &ChannelHub::default())
        .await
        .unwrap();
    session.registry().unmount();
    let app = registry_router(RegistryAppState::new(session.clone()));

    let (status, body) = tokio::time::timeout(WAIT, send(&app, "GET", "/api/patients", None))
        .await
        .expect("list request must not hang");
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"] == "loading" || body["status"] == "ready");

    session.storage().close().await;
}
