//! Handlers for the `/api/cameras` registry.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use crashwatch_core::error::CoreError;
use crashwatch_core::stream::StreamKey;
use crashwatch_core::types::DbId;
use crashwatch_db::models::camera::{Camera, CreateCamera, UpdateCamera};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Camera",
        id,
    })
}

/// POST /api/cameras
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCamera>,
) -> AppResult<(StatusCode, Json<DataResponse<Camera>>)> {
    input.validate()?;
    let camera = state.cameras.create(&input).await?;
    tracing::info!(camera_id = camera.id, name = %camera.name, "Camera registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: camera })))
}

/// GET /api/cameras
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Camera>>>> {
    let cameras = state.cameras.list().await?;
    Ok(Json(DataResponse { data: cameras }))
}

/// GET /api/cameras/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Camera>>> {
    let camera = state.cameras.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: camera }))
}

/// PUT /api/cameras/{id}
///
/// A running stream keeps its source until restarted.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCamera>,
) -> AppResult<Json<DataResponse<Camera>>> {
    input.validate()?;
    let camera = state
        .cameras
        .update(id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: camera }))
}

/// DELETE /api/cameras/{id}
///
/// Stops the camera's stream worker if one is running. Incidents keep
/// their camera details snapshot.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !state.cameras.delete(id).await? {
        return Err(not_found(id));
    }
    if state.orchestrator.stop_stream(&StreamKey::Camera(id)).await {
        tracing::info!(camera_id = id, "Stopped stream of deleted camera");
    }
    Ok(StatusCode::NO_CONTENT)
}
