//! Object detector seam.
//!
//! [`ObjectDetector`] is the boundary to the external detection and tracking
//! model. Inference runs out of process; [`HttpDetector`] ships each batch
//! as multipart JPEGs to an inference server and reads back boxes.

use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::frame::encode_jpeg;

/// Per-request timeout for a whole batch.
const INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// One bounding box returned by the detector, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(alias = "label", alias = "class")]
    pub class_label: String,
    pub confidence: f32,
    /// Identity assigned by the external tracker, stable across frames.
    #[serde(default)]
    pub track_id: Option<u64>,
}

impl DetectionBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Error type for detector calls.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Detector request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Detector returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Detector returned {got} results for a batch of {expected}")]
    BatchMismatch { expected: usize, got: usize },

    #[error("Frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Batch object detector with tracking.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Run inference on a batch. Returns one box list per input frame, in
    /// input order.
    async fn infer(&self, frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError>;
}

// ---------------------------------------------------------------------------
// HttpDetector
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FrameDetections {
    #[serde(default)]
    boxes: Vec<DetectionBox>,
}

/// Calls a remote inference server.
///
/// Request: `multipart/form-data` with parts `frame0..frameN` (JPEG).
/// Response: `[{"boxes": [{x1, y1, x2, y2, label, confidence, track_id}]}]`.
pub struct HttpDetector {
    client: reqwest::Client,
    endpoint: String,
    jpeg_quality: u8,
}

impl HttpDetector {
    pub fn new(endpoint: impl Into<String>, jpeg_quality: u8) -> Self {
        let client = reqwest::Client::builder()
            .timeout(INFERENCE_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
            jpeg_quality,
        }
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn infer(&self, frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError> {
        let mut form = reqwest::multipart::Form::new();
        for (i, frame) in frames.iter().enumerate() {
            let part = reqwest::multipart::Part::bytes(encode_jpeg(frame, self.jpeg_quality)?)
                .file_name(format!("frame{i}.jpg"))
                .mime_str("image/jpeg")?;
            form = form.part(format!("frame{i}"), part);
        }

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(DetectorError::HttpStatus(response.status().as_u16()));
        }

        let results: Vec<FrameDetections> = response.json().await?;
        Ok(results.into_iter().map(|r| r.boxes).collect())
    }
}
