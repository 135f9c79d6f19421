//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`IncidentEvent`]s. It is
//! shared via `Arc<EventBus>` between the recorder, the HTTP handlers and
//! the notification subscribers.

use chrono::{DateTime, Utc};
use crashwatch_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Published by the recorder after a new incident is persisted.
pub const EVENT_INCIDENT_DETECTED: &str = "incident.detected";

/// Published after an operator confirms or dismisses an incident.
pub const EVENT_INCIDENT_REVIEWED: &str = "incident.reviewed";

// ---------------------------------------------------------------------------
// IncidentEvent
// ---------------------------------------------------------------------------

/// An incident lifecycle event.
///
/// Constructed via [`IncidentEvent::new`] and enriched with
/// [`with_incident`](IncidentEvent::with_incident),
/// [`with_camera`](IncidentEvent::with_camera) and
/// [`with_payload`](IncidentEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    /// Dot-separated event name, e.g. `"incident.detected"`.
    pub event_type: String,

    pub incident_id: Option<DbId>,

    /// `None` for incidents raised on ad-hoc URL streams.
    pub camera_id: Option<DbId>,

    /// Free-form JSON payload, usually the serialized incident.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl IncidentEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            incident_id: None,
            camera_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_incident(mut self, incident_id: DbId) -> Self {
        self.incident_id = Some(incident_id);
        self
    }

    pub fn with_camera(mut self, camera_id: Option<DbId>) -> Self {
        self.camera_id = camera_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Publishing never blocks: the detection loop must not stall on a slow
/// notification consumer. Receivers that fall behind observe
/// `RecvError::Lagged` and skip ahead.
pub struct EventBus {
    sender: broadcast::Sender<IncidentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: IncidentEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<IncidentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = IncidentEvent::new(EVENT_INCIDENT_DETECTED)
            .with_incident(42)
            .with_camera(Some(7))
            .with_payload(serde_json::json!({"location": "Main St"}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "incident.detected");
        assert_eq!(received.incident_id, Some(42));
        assert_eq!(received.camera_id, Some(7));
        assert_eq!(received.payload["location"], "Main St");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(IncidentEvent::new(EVENT_INCIDENT_REVIEWED));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, EVENT_INCIDENT_REVIEWED);
        assert_eq!(e2.event_type, EVENT_INCIDENT_REVIEWED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(IncidentEvent::new("orphan.event"));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking_publisher() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for id in 0..5 {
            bus.publish(IncidentEvent::new(EVENT_INCIDENT_DETECTED).with_incident(id));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().incident_id, Some(3));
    }
}
