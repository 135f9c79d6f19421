//! Delivery of incident events to connected browser clients.

pub mod router;

pub use router::NotificationRouter;
