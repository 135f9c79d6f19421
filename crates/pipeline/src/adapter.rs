//! Thresholding and annotation over raw detector output.

use std::sync::Arc;

use image::RgbImage;

use crate::annotate::{detection_label, draw_detection};
use crate::detector::{DetectionBox, DetectorError, ObjectDetector};

/// Detection outcome for one frame.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Whether a target-class box met the confidence threshold.
    pub detected: bool,
    /// The input frame with the qualifying box drawn on it.
    pub annotated_frame: RgbImage,
    /// Every box the detector returned, including sub-threshold ones.
    pub boxes: Vec<DetectionBox>,
}

/// Wraps an [`ObjectDetector`] with the accident confidence threshold.
pub struct DetectorAdapter {
    detector: Arc<dyn ObjectDetector>,
    confidence_threshold: f32,
    target_label: String,
}

impl DetectorAdapter {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        confidence_threshold: f32,
        target_label: impl Into<String>,
    ) -> Self {
        Self {
            detector,
            confidence_threshold,
            target_label: target_label.into(),
        }
    }

    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Detect on a batch. One result per input frame, in input order.
    ///
    /// Any detector failure fails the whole batch.
    pub async fn detect(&self, frames: Vec<RgbImage>) -> Result<Vec<DetectionResult>, DetectorError> {
        let raw = self.detector.infer(&frames).await?;
        if raw.len() != frames.len() {
            return Err(DetectorError::BatchMismatch {
                expected: frames.len(),
                got: raw.len(),
            });
        }

        Ok(frames
            .into_iter()
            .zip(raw)
            .map(|(frame, boxes)| self.evaluate(frame, boxes))
            .collect())
    }

    fn evaluate(&self, mut frame: RgbImage, boxes: Vec<DetectionBox>) -> DetectionResult {
        // Only the first qualifying box is drawn.
        let qualifying = boxes.iter().find(|b| {
            b.class_label == self.target_label && b.confidence >= self.confidence_threshold
        });
        let detected = qualifying.is_some();
        if let Some(detection) = qualifying {
            draw_detection(&mut frame, detection, &detection_label(detection));
        }

        DetectionResult {
            detected,
            annotated_frame: frame,
            boxes,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    /// Returns a fixed box list per frame regardless of content.
    struct FixedDetector(Vec<Vec<DetectionBox>>);

    #[async_trait]
    impl ObjectDetector for FixedDetector {
        async fn infer(&self, _frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    fn scored(label: &str, confidence: f32) -> DetectionBox {
        DetectionBox {
            x1: 4.0,
            y1: 20.0,
            x2: 30.0,
            y2: 40.0,
            class_label: label.into(),
            confidence,
            track_id: None,
        }
    }

    fn adapter(boxes: Vec<Vec<DetectionBox>>) -> DetectorAdapter {
        DetectorAdapter::new(Arc::new(FixedDetector(boxes)), 0.7, "accident")
    }

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n).map(|_| RgbImage::new(64, 64)).collect()
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let results = adapter(vec![vec![scored("accident", 0.7)], vec![scored("accident", 0.69)]])
            .detect(frames(2))
            .await
            .unwrap();

        assert!(results[0].detected);
        assert!(!results[1].detected);
    }

    #[tokio::test]
    async fn other_classes_never_count() {
        let results = adapter(vec![vec![scored("non-accident", 0.99)]])
            .detect(frames(1))
            .await
            .unwrap();

        assert!(!results[0].detected);
        assert_eq!(results[0].boxes.len(), 1);
    }

    #[tokio::test]
    async fn results_preserve_input_order() {
        let results = adapter(vec![
            vec![],
            vec![scored("accident", 0.9)],
            vec![],
        ])
        .detect(frames(3))
        .await
        .unwrap();

        let flags: Vec<bool> = results.iter().map(|r| r.detected).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[tokio::test]
    async fn qualifying_frames_are_annotated_in_place() {
        let results = adapter(vec![vec![scored("accident", 0.9)], vec![]])
            .detect(frames(2))
            .await
            .unwrap();

        assert_ne!(results[0].annotated_frame, RgbImage::new(64, 64));
        assert_eq!(results[1].annotated_frame, RgbImage::new(64, 64));
    }

    #[tokio::test]
    async fn short_detector_response_fails_the_batch() {
        let result = adapter(vec![vec![]]).detect(frames(2)).await;
        assert_matches!(
            result,
            Err(DetectorError::BatchMismatch {
                expected: 2,
                got: 1
            })
        );
    }
}
