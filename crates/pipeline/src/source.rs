//! Video source seam and frame-rate decimation.

use async_trait::async_trait;
use image::RgbImage;

/// Error type for opening or reading a video source.
#[derive(Debug, thiserror::Error)]
pub enum FrameSourceError {
    #[error("Failed to open stream '{url}': {message}")]
    Open { url: String, message: String },

    #[error("Frame read failed: {0}")]
    Read(String),
}

/// An open, decoding video stream.
#[async_trait]
pub trait FrameSource: Send {
    /// Native frame rate reported by the stream. May be `0.0` when unknown.
    fn fps(&self) -> f64;

    /// Next decoded frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError>;

    /// Release the underlying decoder. Idempotent.
    async fn close(&mut self);
}

/// Opens a [`FrameSource`] for a stream URL.
#[async_trait]
pub trait SourceOpener: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, FrameSourceError>;
}

// ---------------------------------------------------------------------------
// FrameSampler
// ---------------------------------------------------------------------------

/// Keeps every Nth frame so a stream is processed at roughly the desired rate.
///
/// `N = max(1, floor(source_fps / desired_fps))`. An unknown or zero source
/// rate keeps every frame.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: u64,
    seen: u64,
}

impl FrameSampler {
    pub fn new(source_fps: f64, desired_fps: f64) -> Self {
        let ratio = source_fps / desired_fps;
        let interval = if ratio.is_finite() && ratio >= 1.0 {
            ratio.floor() as u64
        } else {
            1
        };
        Self { interval, seen: 0 }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Whether the next frame off the stream should be processed.
    pub fn keep(&mut self) -> bool {
        let keep = self.seen % self.interval == 0;
        self.seen += 1;
        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_fps_source_keeps_every_third_frame() {
        let mut sampler = FrameSampler::new(30.0, 10.0);
        let kept: Vec<bool> = (0..7).map(|_| sampler.keep()).collect();

        assert_eq!(sampler.interval(), 3);
        assert_eq!(kept, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn fractional_rates_floor_the_interval() {
        assert_eq!(FrameSampler::new(29.97, 10.0).interval(), 2);
    }

    #[test]
    fn slow_or_unknown_sources_keep_everything() {
        assert_eq!(FrameSampler::new(5.0, 10.0).interval(), 1);
        assert_eq!(FrameSampler::new(0.0, 10.0).interval(), 1);
        assert_eq!(FrameSampler::new(f64::NAN, 10.0).interval(), 1);
    }
}
