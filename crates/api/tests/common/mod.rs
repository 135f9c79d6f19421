#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use crashwatch_api::config::ServerConfig;
use crashwatch_api::router::build_app_router;
use crashwatch_api::state::AppState;
use crashwatch_api::ws::WsManager;
use crashwatch_core::escalation::EscalationPolicy;
use crashwatch_db::models::incident::{CameraDetails, CreateIncident, Incident};
use crashwatch_db::testing::MemoryStore;
use crashwatch_db::IncidentStore;
use crashwatch_events::EventBus;
use crashwatch_pipeline::testing::{MarkerDetector, MemoryBlobStore, ScriptedOpener};
use crashwatch_pipeline::{BatchProcessor, DetectorAdapter, IncidentRecorder, PipelineConfig};
use crashwatch_worker::StreamOrchestrator;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// The application plus handles on its in-memory collaborators.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub orchestrator: Arc<StreamOrchestrator>,
    pub event_bus: Arc<EventBus>,
}

/// Build the full application router over in-memory stores, the marker
/// detector and scripted video sources.
pub fn build_test_app(opener: ScriptedOpener) -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let event_bus = Arc::new(EventBus::default());

    let recorder = IncidentRecorder::new(
        Arc::new(MemoryBlobStore::new("https://evidence.test")),
        store.clone(),
        store.clone(),
        Arc::clone(&event_bus),
    )
    .with_retry_delays(vec![Duration::ZERO]);
    let adapter = DetectorAdapter::new(Arc::new(MarkerDetector::new()), 0.7, "accident");
    let processor = BatchProcessor::new(adapter, Arc::new(recorder), EscalationPolicy::default());
    let orchestrator = Arc::new(StreamOrchestrator::new(
        PipelineConfig::default(),
        Arc::new(opener),
        Arc::new(processor),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        incidents: store.clone(),
        cameras: store.clone(),
        orchestrator: Arc::clone(&orchestrator),
        event_bus: Arc::clone(&event_bus),
        ws_manager: Arc::new(WsManager::new()),
    };

    TestApp {
        app: build_app_router(state, &config),
        store,
        orchestrator,
        event_bus,
    }
}

/// Insert a pending incident directly into the store.
pub async fn seed_incident(store: &MemoryStore, camera_id: Option<i64>, key: &str) -> Incident {
    store
        .insert(&CreateIncident {
            time_detected: Utc::now(),
            camera_id,
            camera_details: CameraDetails::unknown(),
            location: "144 Xuan Thuy".into(),
            screenshot: Some(format!("https://evidence.test/{key}.jpg")),
            dedup_key: key.into(),
        })
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(json)).await
}

pub async fn put_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(json)).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn camera_json(name: &str, stream_url: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "city": "Ha Noi",
        "district": "Cau Giay",
        "ward": "Dich Vong",
        "street": "Xuan Thuy",
        "full_address": format!("{name}, Xuan Thuy, Ha Noi"),
        "stream_url": stream_url,
        "latitude": 21.036,
        "longitude": 105.782
    })
}
