//! Per-stream session registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crashwatch_core::escalation::StateSnapshot;
use crashwatch_core::stream::StreamKey;
use crashwatch_pipeline::CameraSession;

/// Shared handle to one stream's session.
pub type SessionHandle = Arc<Mutex<CameraSession>>;

/// Holds every [`CameraSession`] by stream key.
///
/// Sessions are created on first use and outlive the workers that drive
/// them, so a restarted stream resumes its counters.
#[derive(Default)]
pub struct StateRegistry {
    sessions: RwLock<HashMap<StreamKey, SessionHandle>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `key`, creating it with `init` if absent.
    pub fn session_for(
        &self,
        key: &StreamKey,
        init: impl FnOnce() -> CameraSession,
    ) -> SessionHandle {
        if let Some(session) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return session.clone();
        }

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Current state of one stream, if it has ever been processed.
    pub fn snapshot(&self, key: &StreamKey) -> Option<StateSnapshot> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        let snapshot = session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        Some(snapshot)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use crashwatch_pipeline::motion::MotionCorroborator;

    use super::*;

    fn session(location: &str) -> CameraSession {
        CameraSession::new(location, MotionCorroborator::new(10, 0.4, "accident"))
    }

    #[test]
    fn sessions_are_created_once_per_key() {
        let registry = StateRegistry::new();
        let key = StreamKey::Camera(1);

        let first = registry.session_for(&key, || session("Main St"));
        let second = registry.session_for(&key, || session("Elsewhere"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().unwrap().location(), "Main St");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_stream_has_no_snapshot() {
        let registry = StateRegistry::new();
        assert!(registry.snapshot(&StreamKey::Camera(404)).is_none());
    }

    #[test]
    fn snapshot_reflects_session_state() {
        let registry = StateRegistry::new();
        let key = StreamKey::Url("rtsp://cam/live".into());
        registry
            .session_for(&key, || session("Depot"))
            .lock()
            .unwrap()
            .attach_evidence(Some("https://e/1.jpg".into()));

        let snapshot = registry.snapshot(&key).unwrap();
        assert_eq!(snapshot.state.location, "Depot");
        assert_eq!(snapshot.state.evidence_url.as_deref(), Some("https://e/1.jpg"));
    }
}
