use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crashwatch_api::config::ServerConfig;
use crashwatch_api::notifications::NotificationRouter;
use crashwatch_api::router::build_app_router;
use crashwatch_api::state::AppState;
use crashwatch_api::ws;
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
                .unwrap_or_else(|_| "crashwatch_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    let pipeline_config = PipelineConfig::from_env();
    let storage_config = StorageConfig::from_env();

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = crashwatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    crashwatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    crashwatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let router_handle = tokio::spawn(
        NotificationRouter::new(Arc::clone(&ws_manager)).run(event_bus.subscribe()),
    );
    let webhook_handle = bootstrap::spawn_webhook_forwarder(&event_bus);
    tracing::info!("Event services started");

    // --- Pipeline ---
    let orchestrator = bootstrap::build_orchestrator(
        pipeline_config,
        &storage_config,
        store.clone(),
        store.clone(),
        Arc::clone(&event_bus),
    )
    .await;

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        incidents: store.clone(),
        cameras: store,
        orchestrator: Arc::clone(&orchestrator),
        event_bus: Arc::clone(&event_bus),
        ws_manager: Arc::clone(&ws_manager),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(bootstrap::shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let cleanup_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    // Stream workers first: they may be recording an incident.
    if tokio::time::timeout(cleanup_timeout, orchestrator.shutdown_all())
        .await
        .is_err()
    {
        tracing::warn!("Stream workers did not stop before the shutdown timeout");
    }
    drop(orchestrator);

    // Dropping the last bus handle closes the channel for every subscriber.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), router_handle).await;
    if let Some(handle) = webhook_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }
    tracing::info!("Event services shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}
