//! Unit tests for `WsManager`, without any HTTP upgrade.

use axum::extract::ws::Message;
use crashwatch_api::ws::WsManager;

// ---------------------------------------------------------------------------
// Test: add() and remove() track the connection count
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx = manager.add("conn-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast() reaches every connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_all_connections() {
    let manager = WsManager::new();
    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    manager.broadcast(Message::Text("incident".into())).await;

    assert!(matches!(rx1.recv().await, Some(Message::Text(t)) if t.as_str() == "incident"));
    assert!(matches!(rx2.recv().await, Some(Message::Text(t)) if t.as_str() == "incident"));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all() sends Close and clears the map
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;

    manager.shutdown_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
    assert_eq!(manager.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: ping_all() sends a Ping frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_all_sends_ping() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string()).await;

    manager.ping_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
}
