//! Frame-to-incident processing pipeline.
//!
//! Data flow for one camera:
//!
//! ```text
//! FrameSource ─▶ FrameSampler ─▶ batch ─▶ DetectorAdapter ─▶ MotionCorroborator
//!                                                 │                  │
//!                                                 ▼                  ▼
//!                                          annotated frames   CameraStreamState
//!                                                                    │ Escalate
//!                                                                    ▼
//!                                                           IncidentRecorder
//! ```
//!
//! Scheduling (which streams run, the worker pool, frame buffers) lives in
//! `crashwatch-worker`. This crate only knows how to turn one batch of
//! frames into detection results and incidents.

pub mod adapter;
pub mod annotate;
pub mod config;
pub mod detector;
pub mod ffmpeg;
pub mod frame;
pub mod motion;
pub mod processor;
pub mod recorder;
pub mod session;
pub mod source;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use adapter::{DetectionResult, DetectorAdapter};
pub use config::PipelineConfig;
pub use detector::{DetectionBox, DetectorError, HttpDetector, ObjectDetector};
pub use processor::BatchProcessor;
pub use recorder::IncidentRecorder;
pub use session::CameraSession;
pub use source::{FrameSampler, FrameSource, FrameSourceError, SourceOpener};
