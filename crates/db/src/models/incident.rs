//! Incident models and DTOs.

use crashwatch_core::incident::{IncidentStatus, UNKNOWN_CAMERA_FIELD};
use crashwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::camera::Camera;

/// Camera metadata copied onto the incident when it is recorded.
///
/// Denormalized so the record stays readable after the camera is edited or
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CameraDetails {
    #[sqlx(rename = "camera_name")]
    pub name: String,
    #[sqlx(rename = "camera_address")]
    pub address: String,
}

impl CameraDetails {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_CAMERA_FIELD.to_string(),
            address: UNKNOWN_CAMERA_FIELD.to_string(),
        }
    }
}

impl From<&Camera> for CameraDetails {
    fn from(camera: &Camera) -> Self {
        Self {
            name: camera.name.clone(),
            address: camera.full_address.clone(),
        }
    }
}

/// A row from the `incidents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Incident {
    pub id: DbId,
    pub time_detected: Timestamp,
    pub camera_id: Option<DbId>,
    #[sqlx(flatten)]
    pub camera_details: CameraDetails,
    pub location: String,
    #[sqlx(try_from = "String")]
    pub status: IncidentStatus,
    pub is_false_alarm: bool,
    pub processed_by: Option<String>,
    pub screenshot: Option<String>,
    #[serde(skip)]
    pub dedup_key: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a freshly escalated incident.
///
/// New incidents always start `pending`, not a false alarm, unreviewed.
#[derive(Debug, Clone)]
pub struct CreateIncident {
    pub time_detected: Timestamp,
    pub camera_id: Option<DbId>,
    pub camera_details: CameraDetails,
    pub location: String,
    pub screenshot: Option<String>,
    /// Idempotency key; a retried insert with the same key returns the
    /// existing row.
    pub dedup_key: String,
}

/// Operator review outcome.
#[derive(Debug, Clone)]
pub struct ReviewIncident {
    pub is_false_alarm: bool,
    pub processed_by: Option<String>,
}

impl ReviewIncident {
    pub fn status(&self) -> IncidentStatus {
        IncidentStatus::reviewed(self.is_false_alarm)
    }
}

/// Optional filters for listing incidents. Unset filters match everything.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub camera_id: Option<DbId>,
    pub status: Option<IncidentStatus>,
    pub processed_by: Option<String>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        self.camera_id
            .map_or(true, |id| incident.camera_id == Some(id))
            && self.status.map_or(true, |s| incident.status == s)
            && self
                .processed_by
                .as_deref()
                .map_or(true, |p| incident.processed_by.as_deref() == Some(p))
    }
}
