//! Incident recording: evidence upload, camera lookup, persistence and
//! notification for one escalation.

use std::sync::Arc;
use std::time::Duration;

use crashwatch_core::storage::{evidence_key, BlobStore};
use crashwatch_core::stream::StreamKey;
use crashwatch_core::types::Timestamp;
use crashwatch_db::models::incident::{CameraDetails, CreateIncident, Incident};
use crashwatch_db::{CameraStore, IncidentStore, StoreError};
use crashwatch_events::{EventBus, IncidentEvent, EVENT_INCIDENT_DETECTED};
use image::RgbImage;
use uuid::Uuid;

use crate::frame::encode_jpeg;

/// Backoff between incident insert attempts. One retry per entry.
const PERSIST_RETRY_DELAYS: [Duration; 2] =
    [Duration::from_millis(200), Duration::from_millis(800)];

/// Error type for [`IncidentRecorder::record`].
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Every insert attempt failed. The evidence may still have been uploaded.
    #[error("Incident not persisted after {attempts} attempts: {source}")]
    Persist {
        attempts: usize,
        evidence_url: Option<String>,
        #[source]
        source: StoreError,
    },
}

impl RecordError {
    pub fn evidence_url(&self) -> Option<&str> {
        match self {
            Self::Persist { evidence_url, .. } => evidence_url.as_deref(),
        }
    }
}

/// Turns an escalation into a persisted, announced incident.
///
/// Upload and camera lookup are best effort: a storage outage yields an
/// incident without a screenshot and a registry outage yields placeholder
/// camera details. Only persistence can fail the operation.
pub struct IncidentRecorder {
    blobs: Arc<dyn BlobStore>,
    incidents: Arc<dyn IncidentStore>,
    cameras: Arc<dyn CameraStore>,
    event_bus: Arc<EventBus>,
    key_prefix: Option<String>,
    jpeg_quality: u8,
    retry_delays: Vec<Duration>,
}

impl IncidentRecorder {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        incidents: Arc<dyn IncidentStore>,
        cameras: Arc<dyn CameraStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            blobs,
            incidents,
            cameras,
            event_bus,
            key_prefix: None,
            jpeg_quality: 80,
            retry_delays: PERSIST_RETRY_DELAYS.to_vec(),
        }
    }

    /// Folder namespace prepended to evidence keys.
    pub fn with_key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Record one incident for `stream`.
    pub async fn record(
        &self,
        stream: &StreamKey,
        frame: &RgbImage,
        location: &str,
        detected_at: Timestamp,
    ) -> Result<Incident, RecordError> {
        let key = evidence_key(self.key_prefix.as_deref(), stream, detected_at);
        let evidence_url = self.upload_evidence(frame, &key).await;
        let camera_details = self.camera_details(stream).await;

        let input = CreateIncident {
            time_detected: detected_at,
            camera_id: stream.camera_id(),
            camera_details,
            location: location.to_string(),
            screenshot: evidence_url,
            // Stable across retries of this call only.
            dedup_key: Uuid::new_v4().to_string(),
        };

        let incident = self.persist(&input).await?;
        tracing::info!(
            incident_id = incident.id,
            stream = %stream,
            screenshot = ?incident.screenshot,
            "Incident recorded"
        );

        self.event_bus.publish(
            IncidentEvent::new(EVENT_INCIDENT_DETECTED)
                .with_incident(incident.id)
                .with_camera(incident.camera_id)
                .with_payload(serde_json::to_value(&incident).unwrap_or_default()),
        );

        Ok(incident)
    }

    async fn upload_evidence(&self, frame: &RgbImage, key: &str) -> Option<String> {
        let jpeg = match encode_jpeg(frame, self.jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to encode evidence frame");
                return None;
            }
        };
        match self.blobs.put(jpeg, key).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Evidence upload failed, recording without screenshot");
                None
            }
        }
    }

    async fn camera_details(&self, stream: &StreamKey) -> CameraDetails {
        let Some(camera_id) = stream.camera_id() else {
            return CameraDetails::unknown();
        };
        match self.cameras.get(camera_id).await {
            Ok(Some(camera)) => CameraDetails::from(&camera),
            Ok(None) => {
                tracing::warn!(camera_id, "Camera not found while recording incident");
                CameraDetails::unknown()
            }
            Err(e) => {
                tracing::warn!(camera_id, error = %e, "Camera lookup failed while recording incident");
                CameraDetails::unknown()
            }
        }
    }

    async fn persist(&self, input: &CreateIncident) -> Result<Incident, RecordError> {
        let mut delays = self.retry_delays.iter();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.incidents.insert(input).await {
                Ok(incident) => return Ok(incident),
                Err(e) => match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            attempt = attempts,
                            dedup_key = %input.dedup_key,
                            error = %e,
                            "Incident insert failed, retrying"
                        );
                        tokio::time::sleep(*delay).await;
                    }
                    None => {
                        tracing::error!(
                            attempts,
                            dedup_key = %input.dedup_key,
                            error = %e,
                            "Incident insert failed after all retries"
                        );
                        return Err(RecordError::Persist {
                            attempts,
                            evidence_url: input.screenshot.clone(),
                            source: e,
                        });
                    }
                },
            }
        }
    }
}
