#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::json;
use task_calendar::{Planner, Task, http_api};
use tower::util::ServiceExt;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn new_router() -> axum::Router {
    // Monday
    let planner = Planner::in_memory().unwrap().with_today(d(2025, 9, 1));
    let state = http_api::AppState::new(planner);
    http_api::router(state)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn task_lifecycle_via_http_api() {
    let app = new_router();

    // Create task
    let payload = json!({
        "name": "HTTP Demo",
        "priority": "high",
        "deadline": "2025-09-15",
        "estimated_duration": 60
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: Task = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(created.name, "HTTP Demo");

    // The placement shows up in the schedule
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/schedule/2025-09-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries = json_body(response).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["start_time"], json!("09:00"));
    assert_eq!(entries[0]["end_time"], json!("10:30"));

    // Delete the task
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/tasks/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Ensure the task is gone
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/tasks/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("not_found"));
}

#[tokio::test]
async fn completing_with_overrun_reports_the_flag() {
    let app = new_router();

    let payload = json!({
        "name": "Overrun",
        "priority": "medium",
        "deadline": "2025-09-15",
        "estimated_duration": 60
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let created: Task = serde_json::from_slice(&bytes).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/tasks/{}/complete", created.id))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "actual_duration": 90 })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["time_overrun"], json!(true));
    assert_eq!(outcome["actual_duration"], json!(90));
}

#[tokio::test]
async fn invalid_task_payload_returns_bad_request() {
    let app = new_router();

    let payload = json!({
        "name": "",
        "priority": "low",
        "deadline": "2025-09-15",
        "estimated_duration": 60
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("invalid_request"));
}

#[tokio::test]
async fn malformed_schedule_date_returns_bad_request() {
    let app = new_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/schedule/not-a-date")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("invalid_request"));
}

#[tokio::test]
async fn settings_round_trip_via_http_api() {
    let app = new_router();

    let payload = json!({
        "buffer_minutes": 10,
        "daily_work_minutes": 60,
        "work_start_hour": 8,
        "work_end_hour": 17
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/settings")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/settings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let settings = json_body(response).await;
    assert_eq!(settings, payload);
}

#[tokio::test]
async fn reschedule_reports_a_summary() {
    let app = new_router();

    for name in ["One", "Two"] {
        let payload = json!({
            "name": name,
            "priority": "medium",
            "deadline": "2025-09-20",
            "estimated_duration": 30
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reschedule")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["placed"], json!(2));
    assert_eq!(summary["unplaced"], json!(0));
}
