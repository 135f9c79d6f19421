//! Per-camera detection session: escalation state plus motion history.

use crashwatch_core::escalation::{CameraStreamState, Decision, EscalationPolicy, StateSnapshot};
use crashwatch_core::types::Timestamp;

use crate::adapter::DetectionResult;
use crate::motion::MotionCorroborator;

/// Everything one camera stream accumulates between frames.
#[derive(Debug, Clone)]
pub struct CameraSession {
    state: CameraStreamState,
    motion: MotionCorroborator,
    next_frame_index: u64,
}

impl CameraSession {
    pub fn new(location: impl Into<String>, motion: MotionCorroborator) -> Self {
        Self {
            state: CameraStreamState::new(location),
            motion,
            next_frame_index: 0,
        }
    }

    /// Fold one detection result into the session.
    ///
    /// A frame counts as positive when the primary detection fired or the
    /// motion heuristic corroborated a tracked accident box.
    pub fn observe(
        &mut self,
        result: &DetectionResult,
        policy: EscalationPolicy,
        now: Timestamp,
    ) -> Decision {
        let frame_index = self.next_frame_index;
        self.next_frame_index += 1;

        let corroborated = self.motion.observe(frame_index, &result.boxes);
        let detected = result.detected || corroborated;
        if corroborated && !result.detected {
            tracing::debug!(frame_index, "Accident corroborated by motion");
        }

        self.state.observe(detected, now, policy)
    }

    pub fn attach_evidence(&mut self, url: Option<String>) {
        self.state.attach_evidence(url);
    }

    pub fn location(&self) -> &str {
        &self.state.location
    }

    pub fn state(&self) -> &CameraStreamState {
        &self.state
    }

    pub fn frames_observed(&self) -> u64 {
        self.next_frame_index
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use image::RgbImage;

    use super::*;
    use crate::detector::DetectionBox;

    fn session() -> CameraSession {
        CameraSession::new("Main St", MotionCorroborator::new(5, 0.4, "accident"))
    }

    fn result(detected: bool, boxes: Vec<DetectionBox>) -> DetectionResult {
        DetectionResult {
            detected,
            annotated_frame: RgbImage::new(4, 4),
            boxes,
        }
    }

    fn tracked(x: f32, confidence: f32) -> DetectionBox {
        DetectionBox {
            x1: x,
            y1: 0.0,
            x2: x + 20.0,
            y2: 20.0,
            class_label: "accident".into(),
            confidence,
            track_id: Some(7),
        }
    }

    #[test]
    fn primary_detections_drive_escalation() {
        let mut session = session();
        let policy = EscalationPolicy::default();

        let decisions: Vec<Decision> = (0..10)
            .map(|_| session.observe(&result(true, vec![]), policy, Utc::now()))
            .collect();

        assert_eq!(decisions[9], Decision::Escalate);
        assert_eq!(session.frames_observed(), 10);
        assert!(session.state().alert_triggered);
    }

    #[test]
    fn motion_corroboration_counts_as_positive() {
        let mut session = session();
        let policy = EscalationPolicy::default();

        // Low-confidence box, so the primary signal never fires.
        session.observe(&result(false, vec![tracked(0.0, 0.3)]), policy, Utc::now());
        assert_eq!(session.state().consecutive_accidents, 0);

        session.observe(&result(false, vec![tracked(20.0, 0.3)]), policy, Utc::now());
        assert_eq!(session.state().consecutive_accidents, 1);
    }

    #[test]
    fn evidence_is_visible_in_snapshot() {
        let mut session = session();
        session.attach_evidence(Some("https://bucket/1.jpg".into()));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state.evidence_url.as_deref(), Some("https://bucket/1.jpg"));
        assert_eq!(session.location(), "Main St");
    }
}
