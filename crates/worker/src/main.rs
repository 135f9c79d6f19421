use std::sync::Arc;
use std::time::Duration;

use crashwatch_cloud::StorageConfig;
use crashwatch_db::PgStore;
use crashwatch_events::EventBus;
use crashwatch_pipeline::PipelineConfig;
use crashwatch_worker::bootstrap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crashwatch_worker=debug,crashwatch_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let pipeline_config = PipelineConfig::from_env();
    let storage_config = StorageConfig::from_env();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crashwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crashwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let webhook_handle = bootstrap::spawn_webhook_forwarder(&event_bus);

    // --- Pipeline ---
    let orchestrator = bootstrap::build_orchestrator(
        pipeline_config,
        &storage_config,
        store.clone(),
        store.clone(),
        Arc::clone(&event_bus),
    )
    .await;

    let started = orchestrator
        .start_cameras(store.as_ref())
        .await
        .expect("Failed to load working cameras");
    tracing::info!(count = started.len(), "Stream workers running");

    bootstrap::shutdown_signal().await;

    // --- Shutdown ---
    let stopped = orchestrator.shutdown_all().await;
    tracing::info!(stopped, "Stream workers stopped");

    drop(orchestrator);
    drop(event_bus);
    if let Some(handle) = webhook_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    tracing::info!("Worker shutdown complete");
}
