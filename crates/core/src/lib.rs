//! Domain types and pure logic shared by every crashwatch crate.
//!
//! Nothing in here touches the network, the database or a video decoder:
//! the escalation state machine, incident status names, camera validation
//! and the blob storage seam all live here so they can be unit tested in
//! isolation.

pub mod camera;
pub mod error;
pub mod escalation;
pub mod incident;
pub mod storage;
pub mod stream;
pub mod types;
