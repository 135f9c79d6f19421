use std::sync::Arc;

use crashwatch_db::{CameraStore, IncidentStore};
use crashwatch_events::EventBus;
use crashwatch_worker::StreamOrchestrator;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Incident records.
    pub incidents: Arc<dyn IncidentStore>,
    /// Camera registry.
    pub cameras: Arc<dyn CameraStore>,
    /// Stream workers and their per-camera sessions.
    pub orchestrator: Arc<StreamOrchestrator>,
    /// Incident lifecycle events (detected, reviewed).
    pub event_bus: Arc<EventBus>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
}
