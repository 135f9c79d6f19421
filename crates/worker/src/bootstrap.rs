//! Production wiring shared by the worker binary and the API server.

use std::sync::Arc;

use crashwatch_cloud::{build_blob_store, StorageConfig};
use crashwatch_db::{CameraStore, IncidentStore};
use crashwatch_events::{EventBus, WebhookDelivery, WebhookForwarder};
use crashwatch_pipeline::ffmpeg::FfmpegOpener;
use crashwatch_pipeline::{
    BatchProcessor, DetectorAdapter, HttpDetector, IncidentRecorder, PipelineConfig,
};
use tokio::task::JoinHandle;

use crate::orchestrator::StreamOrchestrator;

/// Build an orchestrator backed by the HTTP detector, ffmpeg decoding and
/// the configured evidence storage.
pub async fn build_orchestrator(
    config: PipelineConfig,
    storage: &StorageConfig,
    incidents: Arc<dyn IncidentStore>,
    cameras: Arc<dyn CameraStore>,
    event_bus: Arc<EventBus>,
) -> Arc<StreamOrchestrator> {
    let config = config.normalized();
    let blobs = build_blob_store(storage).await;

    let recorder = IncidentRecorder::new(blobs, incidents, cameras, event_bus)
        .with_key_prefix(storage.prefix.clone())
        .with_jpeg_quality(config.jpeg_quality);

    let detector = HttpDetector::new(config.detector_url.clone(), config.jpeg_quality);
    let adapter = DetectorAdapter::new(
        Arc::new(detector),
        config.confidence_threshold,
        config.target_label.clone(),
    );
    let processor = BatchProcessor::new(adapter, Arc::new(recorder), config.escalation);
    let opener = FfmpegOpener::new(config.ffmpeg_bin.clone(), config.ffprobe_bin.clone());

    tracing::info!(
        detector_url = %config.detector_url,
        batch_size = config.batch_size,
        pool_size = config.pool_size,
        desired_fps = config.desired_fps,
        "Detection pipeline configured"
    );

    Arc::new(StreamOrchestrator::new(
        config,
        Arc::new(opener),
        Arc::new(processor),
    ))
}

/// Spawn the webhook forwarder if `NOTIFY_WEBHOOK_URLS` lists any endpoint.
pub fn spawn_webhook_forwarder(event_bus: &EventBus) -> Option<JoinHandle<()>> {
    let urls = WebhookForwarder::parse_urls(
        &std::env::var("NOTIFY_WEBHOOK_URLS").unwrap_or_default(),
    );
    if urls.is_empty() {
        return None;
    }

    tracing::info!(count = urls.len(), "Forwarding incident events to webhooks");
    let forwarder = WebhookForwarder::new(urls, WebhookDelivery::new());
    Some(tokio::spawn(forwarder.run(event_bus.subscribe())))
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
