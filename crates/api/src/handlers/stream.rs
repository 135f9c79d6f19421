//! Live processing endpoints: MJPEG feed, per-camera state, worker control.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crashwatch_core::error::CoreError;
use crashwatch_core::escalation::StateSnapshot;
use crashwatch_core::stream::StreamKey;
use crashwatch_core::types::DbId;
use crashwatch_worker::StreamRequest;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Content type of the processed video feed.
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Query parameters for `GET /processed_video_feed`.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub camera_id: Option<DbId>,
    pub camera_url: Option<String>,
}

/// Query parameters for `GET /detection_results`.
#[derive(Debug, Deserialize)]
pub struct DetectionQuery {
    pub camera_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct StartedStreams {
    pub camera_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct StoppedStreams {
    pub stopped: usize,
}

/// GET /processed_video_feed?camera_id=|camera_url=
///
/// Starts the stream worker if needed and relays its annotated frames as
/// an MJPEG multipart stream until the stream ends or the client leaves.
pub async fn processed_video_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<Response> {
    let request = match (params.camera_id, params.camera_url) {
        (Some(id), _) => {
            let camera = state
                .cameras
                .get(id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "Camera",
                    id,
                }))?;
            StreamRequest::for_camera(&camera)
        }
        (None, Some(url)) if !url.trim().is_empty() => StreamRequest::for_url(url.trim()),
        _ => {
            return Err(AppError::BadRequest(
                "camera_id or camera_url is required".into(),
            ))
        }
    };

    tracing::info!(stream = %request.key, "Viewer attached to processed feed");
    let buffer = state.orchestrator.ensure_stream(request).await;

    let parts = futures::stream::unfold(buffer, |buffer| async move {
        let frame = buffer.next().await?;
        Some((Ok::<_, Infallible>(multipart_frame(&frame)), buffer))
    });

    Ok((
        [(CONTENT_TYPE, MJPEG_CONTENT_TYPE), (CACHE_CONTROL, "no-cache")],
        Body::from_stream(parts),
    )
        .into_response())
}

/// Wrap one JPEG in a `--frame` multipart section.
fn multipart_frame(jpeg: &[u8]) -> Bytes {
    const HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    let mut part = Vec::with_capacity(HEADER.len() + jpeg.len() + 2);
    part.extend_from_slice(HEADER);
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

/// GET /detection_results?camera_id=
///
/// Escalation state of one camera, or `404 {}` if it has never streamed.
pub async fn detection_results(
    State(state): State<AppState>,
    Query(params): Query<DetectionQuery>,
) -> Result<Json<DataResponse<StateSnapshot>>, (StatusCode, Json<serde_json::Value>)> {
    params
        .camera_id
        .and_then(|id| state.orchestrator.registry().snapshot(&StreamKey::Camera(id)))
        .map(|snapshot| Json(DataResponse { data: snapshot }))
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(serde_json::json!({}))))
}

/// POST /start_processing
///
/// Start a stream worker for every working camera.
pub async fn start_processing(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<StartedStreams>>> {
    let started = state
        .orchestrator
        .start_cameras(state.cameras.as_ref())
        .await?;
    let camera_ids = started.iter().filter_map(StreamKey::camera_id).collect();
    Ok(Json(DataResponse {
        data: StartedStreams { camera_ids },
    }))
}

/// POST /shutdown
///
/// Stop every stream worker. The server keeps running and sessions are
/// kept, so processing can be started again.
pub async fn shutdown(State(state): State<AppState>) -> Json<DataResponse<StoppedStreams>> {
    let stopped = state.orchestrator.shutdown_all().await;
    tracing::info!(stopped, "Stream workers stopped on request");
    Json(DataResponse {
        data: StoppedStreams { stopped },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_frame_wraps_jpeg_in_boundary() {
        let part = multipart_frame(&[0xFF, 0xD8, 0xFF, 0xD9]);
        let expected: &[u8] =
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n";
        assert_eq!(part.as_ref(), expected);
    }
}
