use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use halfhour_poll::handlers::AppState;
use halfhour_poll::routes::create_routes;
use halfhour_poll::services::RetryPolicy;
use halfhour_poll::store::MemoryStore;

fn app() -> Router {
    create_routes(AppState::new(Arc::new(MemoryStore::new()), RetryPolicy::default()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

async fn create(app: &Router, body: Value) -> String {
    let (status, created) = call(app, Method::POST, "/api/poll", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["pollId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn end_to_end_two_days_two_slots() {
    let app = app();
    let id = create(
        &app,
        json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-02",
            "startTime": "09:00",
            "endTime": "10:00",
            "baseTimeZone": "UTC"
        }),
    )
    .await;

    let (status, grid) = call(&app, Method::GET, &format!("/api/poll/{id}/grid"), None).await;
    assert_eq!(status, StatusCode::OK);
    let cells = grid["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 4);
    assert_eq!(grid["bucketsPerDay"], 2);
    let day_one: Vec<i64> = cells
        .iter()
        .filter(|c| c["date"] == "2024-01-01")
        .map(|c| c["slotKey"].as_i64().unwrap())
        .collect();
    assert_eq!(day_one.len(), 2);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/poll",
        Some(json!({ "pollId": id, "participantId": "a", "slotKeys": day_one })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, results) = call(&app, Method::GET, &format!("/api/poll/{id}/results"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["totalParticipants"], 1);
    for cell in results["cells"].as_array().unwrap() {
        let key = cell["slotKey"].as_i64().unwrap();
        if day_one.contains(&key) {
            assert_eq!(cell["count"], 1);
            assert_eq!(cell["percentage"], 100.0);
            assert_eq!(cell["level"], 5);
            assert_eq!(cell["respondents"], json!(["a"]));
        } else {
            assert_eq!(cell["count"], 0);
            assert_eq!(cell["level"], 0);
        }
    }
    assert_eq!(results["bestSlots"], json!(day_one));
}

#[tokio::test]
async fn legacy_request_shape_round_trips() {
    let app = app();
    let id = create(
        &app,
        json!({
            "startDate": "2024-06-03",
            "endDate": "2024-06-03",
            "startTime": "09:00",
            "endTime": "11:00",
            "baseTimeZone": "America/New_York"
        }),
    )
    .await;

    let (_, record) = call(&app, Method::GET, &format!("/api/poll?id={id}"), None).await;
    assert_eq!(record["id"], id.as_str());
    assert_eq!(record["baseTimeZone"], "America/New_York");
    assert_eq!(record["availabilities"], json!({}));
    assert!(record["createdAt"].is_string());

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/poll",
        Some(json!({
            "pollId": id,
            "email": "x@example.com",
            "availability": [0],
            "timezone": "Europe/Berlin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, record) = call(&app, Method::GET, &format!("/api/poll/{id}"), None).await;
    assert_eq!(record["availabilities"]["x@example.com"], json!([0]));
}

#[tokio::test]
async fn results_in_viewer_zone() {
    let app = app();
    let id = create(
        &app,
        json!({
            "startDate": "2024-01-15",
            "endDate": "2024-01-15",
            "startTime": "09:00",
            "endTime": "10:00",
            "baseTimeZone": "America/New_York"
        }),
    )
    .await;

    let (status, results) = call(
        &app,
        Method::GET,
        &format!("/api/poll/{id}/results?tz=Europe/Berlin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["displayTimeZone"], "Europe/Berlin");
    let first = &results["cells"][0];
    assert_eq!(first["display"]["time"], "15:00");
    assert_eq!(first["display"]["zone"], "CET");
    assert_eq!(first["base"]["time"], "09:00");
    assert_eq!(first["base"]["zone"], "EST");
}

#[tokio::test]
async fn errors_are_distinguishable() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/api/poll?id=nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    assert_eq!(body["retryable"], false);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/poll",
        Some(json!({ "pollId": "nope", "participantId": "a", "slotKeys": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/poll",
        Some(json!({
            "startDate": "2024-01-02",
            "endDate": "2024-01-01",
            "startTime": "09:00",
            "endTime": "10:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/poll",
        Some(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-01",
            "startTime": "09:00",
            "endTime": "10:00",
            "baseTimeZone": "Atlantis/Capital"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_time_zone");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/poll",
        Some(json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-01",
            "startTime": "09:15",
            "endTime": "10:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "unaligned_slot");

    for (field, value) in [("startDate", "2024-13-01"), ("startTime", "25:00")] {
        let mut body = json!({
            "startDate": "2024-01-01",
            "endDate": "2024-01-01",
            "startTime": "09:00",
            "endTime": "10:00"
        });
        body[field] = json!(value);
        let (status, body) = call(&app, Method::POST, "/api/poll", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
        assert_eq!(body["kind"], "validation", "{field}");
        assert_eq!(body["retryable"], false);
    }

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/poll",
        Some(json!({ "pollId": "nope", "participantId": "a", "slotKeys": ["2024-01-01-0"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = call(&app, Method::DELETE, "/api/poll", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn health() {
    let (status, body) = call(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}
