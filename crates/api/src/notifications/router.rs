//! Event bus to WebSocket bridge.

use std::sync::Arc;

use axum::extract::ws::Message;
use crashwatch_events::IncidentEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Broadcasts every incident event to all WebSocket clients as JSON text.
pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run until the [`EventBus`](crashwatch_events::EventBus) is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<IncidentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn route_event(&self, event: &IncidentEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                tracing::debug!(event_type = %event.event_type, incident_id = ?event.incident_id, "Pushing event to clients");
                self.ws_manager.broadcast(Message::Text(json.into())).await;
            }
            Err(e) => {
                tracing::error!(error = %e, event_type = %event.event_type, "Failed to serialize event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crashwatch_events::{EventBus, EVENT_INCIDENT_DETECTED};

    use super::*;

    #[tokio::test]
    async fn events_reach_every_client_as_json() {
        let manager = Arc::new(WsManager::new());
        let mut a = manager.add("a".into()).await;
        let mut b = manager.add("b".into()).await;
        let bus = EventBus::default();
        let handle = tokio::spawn(NotificationRouter::new(manager.clone()).run(bus.subscribe()));

        bus.publish(IncidentEvent::new(EVENT_INCIDENT_DETECTED).with_incident(7));

        for rx in [&mut a, &mut b] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json["event_type"], "incident.detected");
            assert_eq!(json["incident_id"], 7);
        }

        drop(bus);
        handle.await.unwrap();
    }
}
