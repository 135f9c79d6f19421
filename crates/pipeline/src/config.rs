use std::fmt::Display;
use std::str::FromStr;

use crashwatch_core::escalation::{EscalationPolicy, DEFAULT_ESCALATE_AFTER, DEFAULT_RESET_AFTER};

/// Smallest and largest batch handed to the detector in one call.
pub const MIN_BATCH_SIZE: usize = 4;
pub const MAX_BATCH_SIZE: usize = 8;

/// Detection pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target processing rate; the source is decimated down to this.
    pub desired_fps: f64,
    /// Sampled frames per detector call, clamped to `[4, 8]`.
    pub batch_size: usize,
    /// Maximum batches in flight across all cameras.
    pub pool_size: usize,
    /// Annotated JPEG frames buffered per stream for viewers.
    pub frame_buffer_capacity: usize,
    pub confidence_threshold: f32,
    /// Detector class that counts as an accident.
    pub target_label: String,
    pub escalation: EscalationPolicy,
    /// Frames of history kept per track for motion corroboration.
    pub track_window: u64,
    /// Displacement overlap above which a tracked box corroborates a crash.
    pub motion_threshold: f64,
    pub jpeg_quality: u8,
    /// Batch inference endpoint used by [`crate::HttpDetector`].
    pub detector_url: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            desired_fps: 10.0,
            batch_size: MIN_BATCH_SIZE,
            pool_size: 8,
            frame_buffer_capacity: 10,
            confidence_threshold: 0.7,
            target_label: "accident".into(),
            escalation: EscalationPolicy::default(),
            track_window: 10,
            motion_threshold: 0.4,
            jpeg_quality: 80,
            detector_url: "http://127.0.0.1:8000/detect".into(),
            ffmpeg_bin: "ffmpeg".into(),
            ffprobe_bin: "ffprobe".into(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                        |
    /// |-------------------------|--------------------------------|
    /// | `DESIRED_FPS`           | `10`                           |
    /// | `BATCH_SIZE`            | `4` (clamped to 4..=8)         |
    /// | `POOL_SIZE`             | `8`                            |
    /// | `FRAME_BUFFER_CAPACITY` | `10`                           |
    /// | `CONFIDENCE_THRESHOLD`  | `0.7`                          |
    /// | `TARGET_LABEL`          | `accident`                     |
    /// | `ESCALATE_AFTER`        | `10`                           |
    /// | `RESET_AFTER`           | `30`                           |
    /// | `TRACK_WINDOW`          | `10`                           |
    /// | `MOTION_THRESHOLD`      | `0.4`                          |
    /// | `JPEG_QUALITY`          | `80`                           |
    /// | `DETECTOR_URL`          | `http://127.0.0.1:8000/detect` |
    /// | `FFMPEG_BIN`            | `ffmpeg`                       |
    /// | `FFPROBE_BIN`           | `ffprobe`                      |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            desired_fps: env_or("DESIRED_FPS", defaults.desired_fps),
            batch_size: env_or("BATCH_SIZE", defaults.batch_size),
            pool_size: env_or("POOL_SIZE", defaults.pool_size),
            frame_buffer_capacity: env_or("FRAME_BUFFER_CAPACITY", defaults.frame_buffer_capacity),
            confidence_threshold: env_or("CONFIDENCE_THRESHOLD", defaults.confidence_threshold),
            target_label: env_or("TARGET_LABEL", defaults.target_label),
            escalation: EscalationPolicy {
                escalate_after: env_or("ESCALATE_AFTER", DEFAULT_ESCALATE_AFTER),
                reset_after: env_or("RESET_AFTER", DEFAULT_RESET_AFTER),
            },
            track_window: env_or("TRACK_WINDOW", defaults.track_window),
            motion_threshold: env_or("MOTION_THRESHOLD", defaults.motion_threshold),
            jpeg_quality: env_or("JPEG_QUALITY", defaults.jpeg_quality),
            detector_url: env_or("DETECTOR_URL", defaults.detector_url),
            ffmpeg_bin: env_or("FFMPEG_BIN", defaults.ffmpeg_bin),
            ffprobe_bin: env_or("FFPROBE_BIN", defaults.ffprobe_bin),
        };
        config.normalized()
    }

    /// Clamp values into their supported ranges.
    pub fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        self.pool_size = self.pool_size.max(1);
        self.frame_buffer_capacity = self.frame_buffer_capacity.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.track_window = self.track_window.max(1);
        if !(self.desired_fps.is_finite() && self.desired_fps > 0.0) {
            self.desired_fps = Self::default().desired_fps;
        }
        self
    }
}

/// Read and parse an env var, panicking on malformed values.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
