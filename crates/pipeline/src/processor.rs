//! Batch processing: detect, fold into the camera session, record incidents.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use crashwatch_core::escalation::{Decision, EscalationPolicy};
use crashwatch_core::stream::StreamKey;
use image::RgbImage;

use crate::adapter::DetectorAdapter;
use crate::detector::DetectorError;
use crate::recorder::IncidentRecorder;
use crate::session::CameraSession;

/// Runs one camera's batches through detection and escalation.
///
/// Shared by every stream worker. The session lock is held only while a
/// frame's decision is computed, never across detector or storage calls.
pub struct BatchProcessor {
    adapter: DetectorAdapter,
    recorder: Arc<IncidentRecorder>,
    policy: EscalationPolicy,
}

impl BatchProcessor {
    pub fn new(
        adapter: DetectorAdapter,
        recorder: Arc<IncidentRecorder>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            adapter,
            recorder,
            policy,
        }
    }

    /// Process one batch in frame order and return the annotated frames.
    ///
    /// A failed detector call fails the batch without touching the session.
    /// Incident recording failures are logged; the episode stays escalated
    /// so a flaky database cannot produce duplicate alerts.
    pub async fn process(
        &self,
        stream: &StreamKey,
        session: &Mutex<CameraSession>,
        frames: Vec<RgbImage>,
    ) -> Result<Vec<RgbImage>, DetectorError> {
        let results = self.adapter.detect(frames).await?;
        let mut annotated = Vec::with_capacity(results.len());

        for result in results {
            let now = Utc::now();
            let (decision, location) = {
                let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
                let decision = session.observe(&result, self.policy, now);
                (decision, session.location().to_string())
            };

            match decision {
                Decision::Escalate => {
                    tracing::warn!(stream = %stream, %location, "Accident confirmed, recording incident");
                    let evidence_url = match self
                        .recorder
                        .record(stream, &result.annotated_frame, &location, now)
                        .await
                    {
                        Ok(incident) => incident.screenshot,
                        Err(e) => {
                            tracing::error!(stream = %stream, error = %e, "Failed to record incident");
                            e.evidence_url().map(str::to_string)
                        }
                    };
                    session
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .attach_evidence(evidence_url);
                }
                Decision::Rearm => {
                    tracing::info!(stream = %stream, "Camera quiet, re-armed for new incidents");
                }
                Decision::Continue => {}
            }

            annotated.push(result.annotated_frame);
        }

        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crashwatch_db::testing::MemoryStore;
    use crashwatch_events::EventBus;

    use super::*;
    use crate::motion::MotionCorroborator;
    use crate::testing::{marker_frame, sample_camera, MarkerDetector, MemoryBlobStore};

    struct Harness {
        store: Arc<MemoryStore>,
        processor: BatchProcessor,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let recorder = IncidentRecorder::new(
            Arc::new(MemoryBlobStore::new("https://evidence.test")),
            store.clone(),
            store.clone(),
            Arc::new(EventBus::default()),
        )
        .with_retry_delays(vec![Duration::ZERO]);
        let adapter = DetectorAdapter::new(Arc::new(MarkerDetector::new()), 0.7, "accident");
        Harness {
            store,
            processor: BatchProcessor::new(adapter, Arc::new(recorder), EscalationPolicy::default()),
        }
    }

    fn session() -> Mutex<CameraSession> {
        Mutex::new(CameraSession::new(
            "144 Xuan Thuy",
            MotionCorroborator::new(5, 0.4, "accident"),
        ))
    }

    fn frames(accident: bool, count: usize) -> Vec<RgbImage> {
        (0..count).map(|_| marker_frame(accident)).collect()
    }

    #[tokio::test]
    async fn escalation_spans_batches() {
        let h = harness();
        let camera = h.store.seed_camera(&sample_camera("Cam 1", "rtsp://cam/1"));
        let stream = StreamKey::Camera(camera.id);
        let session = session();

        // 4 + 4 positives: below the threshold.
        for _ in 0..2 {
            h.processor.process(&stream, &session, frames(true, 4)).await.unwrap();
        }
        assert!(h.store.incidents().is_empty());

        // Frames 9..12: the 10th positive escalates.
        let out = h.processor.process(&stream, &session, frames(true, 4)).await.unwrap();
        assert_eq!(out.len(), 4);

        let incidents = h.store.incidents();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].location, "144 Xuan Thuy");
        assert_eq!(incidents[0].camera_details.name, "Cam 1");

        let session = session.lock().unwrap();
        assert!(session.state().alert_triggered);
        assert_eq!(session.state().evidence_url, incidents[0].screenshot);
    }

    #[tokio::test]
    async fn sustained_accident_records_one_incident() {
        let h = harness();
        let stream = StreamKey::Camera(1);
        let session = session();

        for _ in 0..10 {
            h.processor.process(&stream, &session, frames(true, 4)).await.unwrap();
        }

        assert_eq!(h.store.incidents().len(), 1);
    }

    #[tokio::test]
    async fn quiet_period_allows_second_incident() {
        let h = harness();
        let stream = StreamKey::Camera(1);
        let session = session();

        let mut script = frames(true, 10);
        script.extend(frames(false, 30));
        script.extend(frames(true, 10));
        for batch in script.chunks(5) {
            h.processor.process(&stream, &session, batch.to_vec()).await.unwrap();
        }

        assert_eq!(h.store.incidents().len(), 2);
    }

    #[tokio::test]
    async fn persist_failure_keeps_episode_escalated() {
        let h = harness();
        h.store.fail_next_inserts(100);
        let stream = StreamKey::Camera(1);
        let session = session();

        h.processor.process(&stream, &session, frames(true, 12)).await.unwrap();

        let session = session.lock().unwrap();
        assert!(session.state().alert_triggered);
        assert!(session.state().evidence_url.is_some());
    }

    #[tokio::test]
    async fn annotated_frames_have_the_box_drawn() {
        let h = harness();
        let out = h
            .processor
            .process(&StreamKey::Camera(1), &session(), vec![marker_frame(true), marker_frame(false)])
            .await
            .unwrap();

        assert_ne!(out[0], marker_frame(true));
        assert_eq!(out[1], marker_frame(false));
    }
}
