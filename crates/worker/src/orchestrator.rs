//! Stream orchestration: one supervised worker task per camera stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crashwatch_core::stream::StreamKey;
use crashwatch_db::models::camera::Camera;
use crashwatch_db::{CameraStore, StoreError};
use crashwatch_pipeline::frame::encode_jpeg;
use crashwatch_pipeline::motion::MotionCorroborator;
use crashwatch_pipeline::{
    BatchProcessor, CameraSession, FrameSampler, FrameSource, PipelineConfig, SourceOpener,
};
use image::RgbImage;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer::FrameBuffer;
use crate::registry::{SessionHandle, StateRegistry};

/// Consecutive frame read failures after which a stream is abandoned.
pub const MAX_CONSECUTIVE_READ_FAILURES: u32 = 3;

/// How long a cancelled worker may take to finish its in-flight batch
/// before it is aborted.
const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// What to stream and where it is.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub key: StreamKey,
    pub source_url: String,
    /// Recorded on incidents raised by this stream.
    pub location: String,
}

impl StreamRequest {
    pub fn for_camera(camera: &Camera) -> Self {
        Self {
            key: StreamKey::Camera(camera.id),
            source_url: camera.stream_url.clone(),
            location: camera.full_address.clone(),
        }
    }

    /// An unregistered stream addressed by URL alone.
    pub fn for_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            key: StreamKey::Url(url.clone()),
            location: url.clone(),
            source_url: url,
        }
    }
}

/// Bookkeeping for one running worker.
struct ManagedStream {
    buffer: Arc<FrameBuffer>,
    cancel: CancellationToken,
    task_handle: JoinHandle<()>,
}

/// Starts, tracks and stops stream workers.
///
/// Created once at startup and shared via `Arc` with the HTTP handlers.
/// Every worker competes for the same bounded pool of batch permits, so
/// adding cameras never increases concurrent detector load.
pub struct StreamOrchestrator {
    config: PipelineConfig,
    opener: Arc<dyn SourceOpener>,
    processor: Arc<BatchProcessor>,
    pool: Arc<Semaphore>,
    registry: Arc<StateRegistry>,
    /// Active workers indexed by stream key.
    workers: Mutex<HashMap<StreamKey, ManagedStream>>,
}

impl StreamOrchestrator {
    pub fn new(
        config: PipelineConfig,
        opener: Arc<dyn SourceOpener>,
        processor: Arc<BatchProcessor>,
    ) -> Self {
        let config = config.normalized();
        Self {
            pool: Arc::new(Semaphore::new(config.pool_size)),
            config,
            opener,
            processor,
            registry: Arc::new(StateRegistry::new()),
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// Return the frame buffer for `request.key`, starting a worker if none
    /// is running. A worker whose stream has ended is replaced.
    pub async fn ensure_stream(&self, request: StreamRequest) -> Arc<FrameBuffer> {
        let mut workers = self.workers.lock().await;
        if let Some(managed) = workers.get(&request.key) {
            if !managed.task_handle.is_finished() {
                return managed.buffer.clone();
            }
            tracing::info!(stream = %request.key, "Replacing finished stream worker");
        }

        let buffer = Arc::new(FrameBuffer::new(self.config.frame_buffer_capacity));
        let cancel = CancellationToken::new();
        let session = self.registry.session_for(&request.key, || {
            CameraSession::new(
                request.location.clone(),
                MotionCorroborator::new(
                    self.config.track_window,
                    self.config.motion_threshold,
                    self.config.target_label.clone(),
                ),
            )
        });

        let worker = StreamWorker {
            key: request.key.clone(),
            source_url: request.source_url,
            opener: self.opener.clone(),
            processor: self.processor.clone(),
            pool: self.pool.clone(),
            session,
            buffer: buffer.clone(),
            desired_fps: self.config.desired_fps,
            batch_size: self.config.batch_size,
            jpeg_quality: self.config.jpeg_quality,
        };

        tracing::info!(stream = %request.key, "Starting stream worker");
        let task_handle = tokio::spawn(worker.run(cancel.clone()));
        workers.insert(
            request.key,
            ManagedStream {
                buffer: buffer.clone(),
                cancel,
                task_handle,
            },
        );
        buffer
    }

    /// Start a worker for every working camera in the registry.
    pub async fn start_cameras(&self, cameras: &dyn CameraStore) -> Result<Vec<StreamKey>, StoreError> {
        let working = cameras.list_working().await?;
        tracing::info!(count = working.len(), "Starting working cameras");

        let mut started = Vec::with_capacity(working.len());
        for camera in &working {
            let request = StreamRequest::for_camera(camera);
            started.push(request.key.clone());
            self.ensure_stream(request).await;
        }
        Ok(started)
    }

    pub async fn is_streaming(&self, key: &StreamKey) -> bool {
        self.workers
            .lock()
            .await
            .get(key)
            .is_some_and(|m| !m.task_handle.is_finished())
    }

    /// Keys of workers that are still running.
    pub async fn active_streams(&self) -> Vec<StreamKey> {
        self.workers
            .lock()
            .await
            .iter()
            .filter(|(_, m)| !m.task_handle.is_finished())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Stop one stream's worker. Returns `false` if it was not known.
    pub async fn stop_stream(&self, key: &StreamKey) -> bool {
        // Held until the worker is gone so `ensure_stream` cannot start a
        // second producer for the same session meanwhile.
        let mut workers = self.workers.lock().await;
        match workers.remove(key) {
            Some(managed) => {
                stop_worker(key, managed).await;
                true
            }
            None => false,
        }
    }

    /// Cancel every worker and wait for each to exit.
    ///
    /// Returns the number of workers stopped. Sessions are kept, so
    /// restarting a stream resumes its escalation state.
    pub async fn shutdown_all(&self) -> usize {
        let mut workers = self.workers.lock().await;
        let drained: Vec<(StreamKey, ManagedStream)> = workers.drain().collect();
        tracing::info!(count = drained.len(), "Stopping all stream workers");

        for (_, managed) in &drained {
            managed.cancel.cancel();
        }
        let count = drained.len();
        for (key, managed) in drained {
            stop_worker(&key, managed).await;
        }

        tracing::info!("All stream workers stopped");
        count
    }
}

/// Cancel a worker and wait for it to exit, aborting it after
/// [`WORKER_STOP_TIMEOUT`]. Returns only once the task is gone, so a
/// replacement never shares the session with a straggler.
async fn stop_worker(key: &StreamKey, managed: ManagedStream) {
    let ManagedStream {
        buffer,
        cancel,
        mut task_handle,
    } = managed;
    cancel.cancel();
    match tokio::time::timeout(WORKER_STOP_TIMEOUT, &mut task_handle).await {
        Ok(Ok(())) => tracing::debug!(stream = %key, "Stream worker stopped"),
        Ok(Err(e)) => tracing::error!(stream = %key, error = %e, "Stream worker panicked"),
        Err(_) => {
            tracing::warn!(stream = %key, "Stream worker did not stop in time, aborting");
            task_handle.abort();
            if let Err(e) = task_handle.await {
                if !e.is_cancelled() {
                    tracing::error!(stream = %key, error = %e, "Stream worker panicked");
                }
            }
        }
    }
    buffer.close();
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Decode loop for one stream.
struct StreamWorker {
    key: StreamKey,
    source_url: String,
    opener: Arc<dyn SourceOpener>,
    processor: Arc<BatchProcessor>,
    pool: Arc<Semaphore>,
    session: SessionHandle,
    buffer: Arc<FrameBuffer>,
    desired_fps: f64,
    batch_size: usize,
    jpeg_quality: u8,
}

impl StreamWorker {
    async fn run(self, cancel: CancellationToken) {
        let opened = tokio::select! {
            _ = cancel.cancelled() => {
                self.buffer.close();
                return;
            }
            opened = self.opener.open(&self.source_url) => opened,
        };
        let mut source = match opened {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(stream = %self.key, error = %e, "Failed to open stream");
                self.buffer.close();
                return;
            }
        };

        self.decode_loop(source.as_mut(), &cancel).await;

        source.close().await;
        self.buffer.close();
        tracing::info!(stream = %self.key, "Stream worker exited");
    }

    async fn decode_loop(&self, source: &mut dyn FrameSource, cancel: &CancellationToken) {
        let mut sampler = FrameSampler::new(source.fps(), self.desired_fps);
        tracing::debug!(
            stream = %self.key,
            source_fps = source.fps(),
            interval = sampler.interval(),
            "Decoding stream"
        );

        let mut batch: Vec<RgbImage> = Vec::with_capacity(self.batch_size);
        let mut read_failures = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(stream = %self.key, "Stream worker cancelled");
                    return;
                }
                next = source.next_frame() => next,
            };

            match next {
                Ok(Some(frame)) => {
                    read_failures = 0;
                    if !sampler.keep() {
                        continue;
                    }
                    batch.push(frame);
                    if batch.len() >= self.batch_size {
                        self.submit(std::mem::take(&mut batch)).await;
                    }
                }
                Ok(None) => {
                    if !batch.is_empty() {
                        self.submit(std::mem::take(&mut batch)).await;
                    }
                    tracing::info!(stream = %self.key, "End of stream");
                    return;
                }
                Err(e) => {
                    read_failures += 1;
                    tracing::warn!(
                        stream = %self.key,
                        attempt = read_failures,
                        error = %e,
                        "Frame read failed"
                    );
                    if read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        tracing::error!(stream = %self.key, "Too many read failures, ending stream");
                        return;
                    }
                }
            }
        }
    }

    /// Run one batch under a pool permit and publish its annotated frames.
    async fn submit(&self, frames: Vec<RgbImage>) {
        let Ok(_permit) = self.pool.acquire().await else {
            return;
        };

        match self.processor.process(&self.key, &self.session, frames).await {
            Ok(annotated) => {
                for frame in &annotated {
                    match encode_jpeg(frame, self.jpeg_quality) {
                        Ok(jpeg) => self.buffer.push(jpeg),
                        Err(e) => {
                            tracing::warn!(stream = %self.key, error = %e, "Failed to encode frame")
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(stream = %self.key, error = %e, "Detection failed, dropping batch");
            }
        }
    }
}
