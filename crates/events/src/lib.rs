//! Incident event bus and outbound notification delivery.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`IncidentEvent`]: the event envelope for incident lifecycle changes.
//! - [`delivery`]: external delivery channels (webhook).
//! - [`WebhookForwarder`]: bus subscriber that fans events out to the
//!   configured webhook URLs.

pub mod bus;
pub mod delivery;
pub mod forwarder;

pub use bus::{EventBus, IncidentEvent, EVENT_INCIDENT_DETECTED, EVENT_INCIDENT_REVIEWED};
pub use delivery::webhook::WebhookDelivery;
pub use forwarder::WebhookForwarder;
