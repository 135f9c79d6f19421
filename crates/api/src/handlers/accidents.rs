//! Handlers for incident records and operator review.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crashwatch_core::error::CoreError;
use crashwatch_core::incident::IncidentStatus;
use crashwatch_core::types::DbId;
use crashwatch_db::models::incident::{Incident, IncidentFilter, ReviewIncident};
use crashwatch_events::{IncidentEvent, EVENT_INCIDENT_REVIEWED};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /api/accidents`.
#[derive(Debug, Deserialize)]
pub struct AccidentQuery {
    pub camera_id: Option<DbId>,
    pub status: Option<String>,
    pub processed_by: Option<String>,
}

impl AccidentQuery {
    fn into_filter(self) -> Result<IncidentFilter, CoreError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(IncidentStatus::from_name)
            .transpose()?;
        Ok(IncidentFilter {
            camera_id: self.camera_id,
            status,
            processed_by: self.processed_by.filter(|p| !p.is_empty()),
        })
    }
}

/// Body of `POST /confirm_accident`.
#[derive(Debug, Deserialize)]
pub struct ConfirmAccident {
    pub accident_id: DbId,
    #[serde(rename = "isFalseAlarm")]
    pub is_false_alarm: bool,
    #[serde(rename = "processedBy", default)]
    pub processed_by: Option<String>,
}

/// GET /api/accidents
///
/// Newest first, optionally filtered by camera, status and reviewer.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<AccidentQuery>,
) -> AppResult<Json<DataResponse<Vec<Incident>>>> {
    let filter = params.into_filter()?;
    let incidents = state.incidents.list(&filter).await?;
    Ok(Json(DataResponse { data: incidents }))
}

/// GET /api/accidents/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Incident>>> {
    let incident = state
        .incidents
        .get(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Accident",
            id,
        }))?;
    Ok(Json(DataResponse { data: incident }))
}

/// DELETE /api/accidents/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if state.incidents.delete(id).await? {
        tracing::info!(incident_id = id, "Incident deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Accident",
            id,
        }))
    }
}

/// POST /confirm_accident
///
/// Record the operator's verdict and announce it on the event bus.
pub async fn confirm(
    State(state): State<AppState>,
    Json(input): Json<ConfirmAccident>,
) -> AppResult<Json<DataResponse<Incident>>> {
    let review = ReviewIncident {
        is_false_alarm: input.is_false_alarm,
        processed_by: input.processed_by.filter(|p| !p.trim().is_empty()),
    };

    let incident = state
        .incidents
        .review(input.accident_id, &review)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Accident",
            id: input.accident_id,
        }))?;

    tracing::info!(
        incident_id = incident.id,
        status = %incident.status,
        processed_by = ?incident.processed_by,
        "Incident reviewed"
    );
    state.event_bus.publish(
        IncidentEvent::new(EVENT_INCIDENT_REVIEWED)
            .with_incident(incident.id)
            .with_camera(incident.camera_id)
            .with_payload(serde_json::to_value(&incident).unwrap_or_default()),
    );

    Ok(Json(DataResponse { data: incident }))
}
