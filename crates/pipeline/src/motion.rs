//! Motion-based corroboration of accident detections.
//!
//! Tracks supplied by the detector are followed over a short window of
//! frames. A tracked accident-class box whose center has moved far relative
//! to its own size corroborates the detection, even when its confidence sits
//! below the primary threshold.
//!
//! This is a heuristic over tracker output, not re-identification: track
//! identity comes from the detector.

use std::collections::{HashMap, VecDeque};

use crate::detector::DetectionBox;

#[derive(Debug, Clone, Copy)]
struct TrackSample {
    frame_index: u64,
    center: (f32, f32),
}

/// Per-camera track history and overlap scoring.
#[derive(Debug, Clone)]
pub struct MotionCorroborator {
    window: u64,
    threshold: f64,
    target_label: String,
    tracks: HashMap<u64, VecDeque<TrackSample>>,
}

impl MotionCorroborator {
    pub fn new(window: u64, threshold: f64, target_label: impl Into<String>) -> Self {
        Self {
            window: window.max(1),
            threshold,
            target_label: target_label.into(),
            tracks: HashMap::new(),
        }
    }

    /// Record this frame's tracked boxes and report whether any of them
    /// corroborates an accident.
    pub fn observe(&mut self, frame_index: u64, boxes: &[DetectionBox]) -> bool {
        let oldest_kept = frame_index.saturating_sub(self.window - 1);
        let mut corroborated = false;

        for detection in boxes {
            if detection.class_label != self.target_label {
                continue;
            }
            let Some(track_id) = detection.track_id else {
                continue;
            };

            let history = self.tracks.entry(track_id).or_default();
            history.push_back(TrackSample {
                frame_index,
                center: detection.center(),
            });
            while history
                .front()
                .is_some_and(|s| s.frame_index < oldest_kept)
            {
                history.pop_front();
            }

            if history.len() < 2 {
                continue;
            }
            if let Some(overlap) = displacement_overlap(history, detection) {
                if round4(overlap) > self.threshold {
                    corroborated = true;
                }
            }
        }

        // Forget tracks that left the scene.
        self.tracks.retain(|_, history| {
            history
                .back()
                .is_some_and(|s| s.frame_index >= oldest_kept)
        });

        corroborated
    }

    pub fn tracked_count(&self) -> usize {
        self.tracks.len()
    }
}

/// Axis displacement across the retained history relative to box size.
///
/// Wide boxes (crashed vehicles lying sideways) weight vertical movement by
/// `3 * (w / h - 1)`.
fn displacement_overlap(history: &VecDeque<TrackSample>, detection: &DetectionBox) -> Option<f64> {
    let first = history.front()?.center;
    let last = history.back()?.center;
    let width_disp = f64::from((last.0 - first.0).abs());
    let height_disp = f64::from((last.1 - first.1).abs());

    let w = f64::from(detection.width());
    let h = f64::from(detection.height());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }

    let overlap = if w > h {
        let ratio = w / h - 1.0;
        (width_disp + height_disp * 3.0 * ratio) / (w + h)
    } else {
        (width_disp + height_disp) / (w + h)
    };
    Some(overlap)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
