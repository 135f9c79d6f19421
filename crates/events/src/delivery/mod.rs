//! External delivery channels for incident events.

pub mod webhook;
