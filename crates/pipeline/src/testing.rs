//! Deterministic stand-ins for the pipeline's external seams.
//!
//! Frames carry their own ground truth: a "marker" frame has a bright red
//! top-left pixel, and [`MarkerDetector`] reports an accident exactly for
//! those frames. Scripted sources therefore drive the escalation state
//! machine without any model or decoder.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crashwatch_core::storage::{BlobStore, StorageError};
use crashwatch_db::models::camera::CreateCamera;
use image::{Rgb, RgbImage};

use crate::detector::{DetectionBox, DetectorError, ObjectDetector};
use crate::source::{FrameSource, FrameSourceError, SourceOpener};

const MARKER: Rgb<u8> = Rgb([255, 0, 0]);
const FRAME_SIZE: u32 = 32;

/// Registration payload for a working camera.
pub fn sample_camera(name: &str, stream_url: &str) -> CreateCamera {
    CreateCamera {
        name: name.into(),
        city: "Ha Noi".into(),
        district: "Cau Giay".into(),
        ward: "Dich Vong".into(),
        street: "Xuan Thuy".into(),
        full_address: format!("{name}, Xuan Thuy, Ha Noi"),
        stream_url: stream_url.into(),
        description: String::new(),
        latitude: 21.036,
        longitude: 105.782,
        status: None,
    }
}

/// A frame the [`MarkerDetector`] will (or will not) flag.
pub fn marker_frame(accident: bool) -> RgbImage {
    let mut frame = RgbImage::new(FRAME_SIZE, FRAME_SIZE);
    if accident {
        frame.put_pixel(0, 0, MARKER);
    }
    frame
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Flags frames produced by [`marker_frame`]`(true)` as accidents.
#[derive(Default)]
pub struct MarkerDetector {
    calls: AtomicUsize,
}

impl MarkerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches inferred so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectDetector for MarkerDetector {
    async fn infer(&self, frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(frames
            .iter()
            .map(|frame| {
                if *frame.get_pixel(0, 0) == MARKER {
                    vec![DetectionBox {
                        x1: 4.0,
                        y1: 12.0,
                        x2: 28.0,
                        y2: 28.0,
                        class_label: "accident".into(),
                        confidence: 0.9,
                        track_id: None,
                    }]
                } else {
                    Vec::new()
                }
            })
            .collect())
    }
}

/// Fails the listed calls (0-based) and behaves like [`MarkerDetector`]
/// otherwise.
pub struct FlakyDetector {
    inner: MarkerDetector,
    failing_calls: HashSet<usize>,
}

impl FlakyDetector {
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            inner: MarkerDetector::new(),
            failing_calls: calls.into_iter().collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

#[async_trait]
impl ObjectDetector for FlakyDetector {
    async fn infer(&self, frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError> {
        let call = self.inner.calls();
        let result = self.inner.infer(frames).await;
        if self.failing_calls.contains(&call) {
            return Err(DetectorError::HttpStatus(503));
        }
        result
    }
}

/// A [`MarkerDetector`] that takes `delay` per batch and records how many
/// batches were in flight at once.
pub struct SlowDetector {
    inner: MarkerDetector,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SlowDetector {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MarkerDetector::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectDetector for SlowDetector {
    async fn infer(&self, frames: &[RgbImage]) -> Result<Vec<Vec<DetectionBox>>, DetectorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Released on completion or when the caller is dropped mid-batch.
        let _guard = InFlight(&self.in_flight);
        tokio::time::sleep(self.delay).await;
        self.inner.infer(frames).await
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One step of a scripted stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// A marker frame, flagged as an accident when `true`.
    Frame(bool),
    /// A failed frame read.
    ReadError,
}

/// Plays back a fixed sequence of marker frames and read errors.
pub struct ScriptedSource {
    script: std::vec::IntoIter<ScriptStep>,
    fps: f64,
    frame_delay: Duration,
    hold_open: bool,
    closed: bool,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        if self.closed {
            return Ok(None);
        }
        if !self.frame_delay.is_zero() {
            tokio::time::sleep(self.frame_delay).await;
        }
        match self.script.next() {
            Some(ScriptStep::Frame(accident)) => Ok(Some(marker_frame(accident))),
            Some(ScriptStep::ReadError) => Err(FrameSourceError::Read("corrupt packet".into())),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Opens [`ScriptedSource`]s by URL.
#[derive(Default)]
pub struct ScriptedOpener {
    scripts: Mutex<HashMap<String, Vec<ScriptStep>>>,
    fps: f64,
    frame_delay: Duration,
    hold_open: bool,
    opened: AtomicUsize,
}

impl ScriptedOpener {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            ..Default::default()
        }
    }

    /// Register the detection outcome of each frame for `url`.
    pub fn with_script(self, url: &str, script: Vec<bool>) -> Self {
        self.with_steps(url, script.into_iter().map(ScriptStep::Frame).collect())
    }

    /// Register a script that may interleave read errors with frames.
    pub fn with_steps(self, url: &str, steps: Vec<ScriptStep>) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(url.to_string(), steps);
        self
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Keep streams open after the script ends instead of reporting EOS.
    pub fn holding_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Number of sources opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceOpener for ScriptedOpener {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        let script = self
            .scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| FrameSourceError::Open {
                url: url.to_string(),
                message: "no script registered".into(),
            })?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSource {
            script: script.into_iter(),
            fps: self.fps,
            frame_delay: self.frame_delay,
            hold_open: self.hold_open,
            closed: false,
        }))
    }
}

// ---------------------------------------------------------------------------
// Blob stores
// ---------------------------------------------------------------------------

/// Keeps uploaded objects in memory.
pub struct MemoryBlobStore {
    base_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), bytes);
        Ok(format!("{}/{key}", self.base_url))
    }
}

/// Rejects every upload.
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, _bytes: Vec<u8>, key: &str) -> Result<String, StorageError> {
        Err(StorageError::Upload {
            key: key.to_string(),
            message: "storage offline".into(),
        })
    }
}
