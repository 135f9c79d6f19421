pub mod accidents;
pub mod cameras;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{accidents as accident_handlers, stream};
use crate::state::AppState;
use crate::ws;

/// Build the application route tree.
///
/// ```text
/// /ws                           WebSocket (incident events)
///
/// /processed_video_feed         MJPEG feed (?camera_id= | ?camera_url=)
/// /detection_results            escalation state (?camera_id=)
/// /confirm_accident             operator review (POST)
/// /start_processing             start all working cameras (POST)
/// /shutdown                     stop all stream workers (POST)
///
/// /api/accidents                list (?camera_id=&status=&processed_by=)
/// /api/accidents/{id}           get, delete
///
/// /api/cameras                  list, create
/// /api/cameras/{id}             get, update, delete
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/processed_video_feed", get(stream::processed_video_feed))
        .route("/detection_results", get(stream::detection_results))
        .route("/confirm_accident", post(accident_handlers::confirm))
        .route("/start_processing", post(stream::start_processing))
        .route("/shutdown", post(stream::shutdown))
        .nest("/api/accidents", accidents::router())
        .nest("/api/cameras", cameras::router())
}
