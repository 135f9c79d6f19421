//! Integration tests for the camera registry endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, camera_json, delete, get, post_json, put_json};
use crashwatch_pipeline::testing::ScriptedOpener;
use serde_json::json;

fn app() -> common::TestApp {
    common::build_test_app(ScriptedOpener::new(10.0))
}

// ---------------------------------------------------------------------------
// Test: POST /api/cameras
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_camera_returns_201_with_defaults() {
    let t = app();
    let response = post_json(t.app, "/api/cameras", camera_json("Cam 1", "rtsp://cam/1")).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Cam 1");
    assert_eq!(json["data"]["status"], "working");
    assert_eq!(json["data"]["description"], "");
}

#[tokio::test]
async fn create_camera_rejects_bad_coordinates() {
    let t = app();
    let mut body = camera_json("Cam 1", "rtsp://cam/1");
    body["latitude"] = json!(123.0);

    let response = post_json(t.app, "/api/cameras", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_camera_rejects_blank_name() {
    let t = app();
    let response = post_json(t.app, "/api/cameras", camera_json("  ", "rtsp://cam/1")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: GET / PUT / DELETE /api/cameras/{id}
// ---------------------------------------------------------------------------

#[tokio::test]
async fn camera_lifecycle() {
    let t = app();
    let created = body_json(
        post_json(t.app.clone(), "/api/cameras", camera_json("Cam 1", "rtsp://cam/1")).await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/cameras/{id}");

    let listed = body_json(get(t.app.clone(), "/api/cameras").await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let updated = put_json(t.app.clone(), &uri, json!({ "status": "maintenance" })).await;
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(updated["data"]["status"], "maintenance");
    assert_eq!(updated["data"]["name"], "Cam 1");

    assert_eq!(delete(t.app.clone(), &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get(t.app, &uri).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_rejects_unknown_status() {
    let t = app();
    let created = body_json(
        post_json(t.app.clone(), "/api/cameras", camera_json("Cam 1", "rtsp://cam/1")).await,
    )
    .await;
    let uri = format!("/api/cameras/{}", created["data"]["id"]);

    let response = put_json(t.app, &uri, json!({ "status": "offline" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_camera_returns_404() {
    let t = app();
    let response = put_json(t.app, "/api/cameras/77", json!({ "name": "New" })).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
