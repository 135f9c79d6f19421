//! Stream scheduling for the accident detection pipeline.
//!
//! [`StreamOrchestrator`] runs one worker task per camera stream. Workers
//! decode and sample frames, hand batches to the shared
//! [`crashwatch_pipeline::BatchProcessor`] under a bounded pool, and push
//! the annotated JPEG frames into a per-stream [`FrameBuffer`] for live
//! viewers. Per-camera sessions live in the [`StateRegistry`].

pub mod bootstrap;
pub mod buffer;
pub mod orchestrator;
pub mod registry;

pub use buffer::FrameBuffer;
pub use orchestrator::{StreamOrchestrator, StreamRequest};
pub use registry::StateRegistry;
