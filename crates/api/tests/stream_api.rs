//! Integration tests for the live processing endpoints.

mod common;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use common::{body_bytes, body_json, get, post_json};
use crashwatch_pipeline::testing::{sample_camera, ScriptedOpener};
use serde_json::json;

fn positives(n: usize) -> Vec<bool> {
    vec![true; n]
}

fn count_parts(body: &[u8]) -> usize {
    body.windows(b"--frame".len())
        .filter(|w| *w == b"--frame")
        .count()
}

// ---------------------------------------------------------------------------
// Test: GET /processed_video_feed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn feed_without_camera_returns_400() {
    let t = common::build_test_app(ScriptedOpener::new(10.0));
    let response = get(t.app, "/processed_video_feed").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_for_unknown_camera_returns_404() {
    let t = common::build_test_app(ScriptedOpener::new(10.0));
    let response = get(t.app, "/processed_video_feed?camera_id=404").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feed_with_malformed_camera_id_returns_400() {
    let t = common::build_test_app(ScriptedOpener::new(10.0));
    let response = get(t.app, "/processed_video_feed?camera_id=cam-1").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_streams_frames_and_records_incident() {
    let t = common::build_test_app(
        ScriptedOpener::new(10.0).with_script("rtsp://cam/1", positives(12)),
    );
    let camera = t.store.seed_camera(&sample_camera("Cam 1", "rtsp://cam/1"));

    let response = get(
        t.app.clone(),
        &format!("/processed_video_feed?camera_id={}", camera.id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    let body = body_bytes(response).await;
    assert!(count_parts(&body) > 0);

    let incidents = t.store.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].camera_id, Some(camera.id));
    assert_eq!(incidents[0].camera_details.name, "Cam 1");

    let state = body_json(
        get(t.app, &format!("/detection_results?camera_id={}", camera.id)).await,
    )
    .await;
    assert_eq!(state["data"]["phase"], "escalated");
    assert_eq!(state["data"]["consecutive_accidents"], 12);
    assert_eq!(state["data"]["alert_triggered"], true);
    assert_eq!(state["data"]["location"], camera.full_address);
}

#[tokio::test]
async fn feed_by_url_uses_placeholder_camera_details() {
    let t = common::build_test_app(
        ScriptedOpener::new(10.0).with_script("rtsp://10.0.0.9/live", positives(10)),
    );

    let response = get(t.app, "/processed_video_feed?camera_url=rtsp://10.0.0.9/live").await;
    assert_eq!(response.status(), StatusCode::OK);
    body_bytes(response).await;

    let incidents = t.store.incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].camera_id, None);
    assert_eq!(incidents[0].camera_details.address, "Unknown");
}

// ---------------------------------------------------------------------------
// Test: GET /detection_results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn detection_results_for_unknown_camera_is_404_empty_object() {
    let t = common::build_test_app(ScriptedOpener::new(10.0));

    let response = get(t.app.clone(), "/detection_results?camera_id=42").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({}));

    let response = get(t.app, "/detection_results").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({}));
}

// ---------------------------------------------------------------------------
// Test: POST /start_processing and POST /shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_processing_runs_working_cameras_until_shutdown() {
    let t = common::build_test_app(
        ScriptedOpener::new(10.0)
            .with_script("rtsp://cam/1", positives(2))
            .with_script("rtsp://cam/2", positives(2))
            .holding_open(),
    );
    let working = t.store.seed_camera(&sample_camera("Cam 1", "rtsp://cam/1"));
    let mut parked = sample_camera("Cam 2", "rtsp://cam/2");
    parked.status = Some("maintenance".into());
    t.store.seed_camera(&parked);

    let started = body_json(post_json(t.app.clone(), "/start_processing", json!({})).await).await;
    assert_eq!(started["data"]["camera_ids"], json!([working.id]));

    let health = body_json(get(t.app.clone(), "/health").await).await;
    assert_eq!(health["active_streams"], 1);

    let stopped = body_json(post_json(t.app.clone(), "/shutdown", json!({})).await).await;
    assert_eq!(stopped["data"]["stopped"], 1);
    assert!(t.orchestrator.active_streams().await.is_empty());
}
