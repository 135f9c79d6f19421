//! In-memory store implementations for tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use crashwatch_core::incident::IncidentStatus;
use crashwatch_core::types::DbId;

use crate::models::camera::{Camera, CreateCamera, UpdateCamera};
use crate::models::incident::{CreateIncident, Incident, IncidentFilter, ReviewIncident};
use crate::store::{CameraStore, IncidentStore, StoreError};

#[derive(Default)]
struct Tables {
    cameras: Vec<Camera>,
    incidents: Vec<Incident>,
    next_camera_id: DbId,
    next_incident_id: DbId,
}

/// Process-local store implementing both [`IncidentStore`] and
/// [`CameraStore`], with switches for injecting failures.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing_inserts: AtomicU32,
    insert_attempts: AtomicU32,
    camera_lookups_fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` incident inserts fail with [`StoreError::Unavailable`].
    pub fn fail_next_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Make every camera lookup by id fail.
    pub fn fail_camera_lookups(&self, fail: bool) {
        self.camera_lookups_fail.store(fail, Ordering::SeqCst);
    }

    /// Total incident inserts attempted, including injected failures.
    pub fn insert_attempts(&self) -> u32 {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of all stored incidents in insertion order.
    pub fn incidents(&self) -> Vec<Incident> {
        self.lock().incidents.clone()
    }

    /// Insert a camera without going through the async trait.
    pub fn seed_camera(&self, input: &CreateCamera) -> Camera {
        let mut tables = self.lock();
        tables.next_camera_id += 1;
        let now = Utc::now();
        let camera = Camera {
            id: tables.next_camera_id,
            name: input.name.clone(),
            city: input.city.clone(),
            district: input.district.clone(),
            ward: input.ward.clone(),
            street: input.street.clone(),
            full_address: input.full_address.clone(),
            stream_url: input.stream_url.clone(),
            description: input.description.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            status: input.status_or_default().to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.cameras.push(camera.clone());
        camera
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn insert(&self, input: &CreateIncident) -> Result<Incident, StoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }

        let mut tables = self.lock();
        if let Some(existing) = tables
            .incidents
            .iter()
            .find(|i| i.dedup_key == input.dedup_key)
        {
            return Ok(existing.clone());
        }
        tables.next_incident_id += 1;
        let now = Utc::now();
        let incident = Incident {
            id: tables.next_incident_id,
            time_detected: input.time_detected,
            camera_id: input.camera_id,
            camera_details: input.camera_details.clone(),
            location: input.location.clone(),
            status: IncidentStatus::Pending,
            is_false_alarm: false,
            processed_by: None,
            screenshot: input.screenshot.clone(),
            dedup_key: input.dedup_key.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.incidents.push(incident.clone());
        Ok(incident)
    }

    async fn get(&self, id: DbId) -> Result<Option<Incident>, StoreError> {
        Ok(self.lock().incidents.iter().find(|i| i.id == id).cloned())
    }

    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
        let mut rows: Vec<Incident> = self
            .lock()
            .incidents
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.time_detected
                .cmp(&a.time_detected)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn review(
        &self,
        id: DbId,
        input: &ReviewIncident,
    ) -> Result<Option<Incident>, StoreError> {
        let mut tables = self.lock();
        let Some(incident) = tables.incidents.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        incident.status = input.status();
        incident.is_false_alarm = input.is_false_alarm;
        incident.processed_by = input.processed_by.clone();
        incident.updated_at = Utc::now();
        Ok(Some(incident.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let before = tables.incidents.len();
        tables.incidents.retain(|i| i.id != id);
        Ok(tables.incidents.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl CameraStore for MemoryStore {
    async fn create(&self, input: &CreateCamera) -> Result<Camera, StoreError> {
        Ok(self.seed_camera(input))
    }

    async fn get(&self, id: DbId) -> Result<Option<Camera>, StoreError> {
        if self.camera_lookups_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected camera lookup failure".into()));
        }
        Ok(self.lock().cameras.iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Camera>, StoreError> {
        Ok(self.lock().cameras.clone())
    }

    async fn list_working(&self) -> Result<Vec<Camera>, StoreError> {
        Ok(self
            .lock()
            .cameras
            .iter()
            .filter(|c| c.is_working())
            .cloned()
            .collect())
    }

    async fn update(&self, id: DbId, input: &UpdateCamera) -> Result<Option<Camera>, StoreError> {
        let mut tables = self.lock();
        let Some(camera) = tables.cameras.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        input.apply_to(camera);
        camera.updated_at = Utc::now();
        Ok(Some(camera.clone()))
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let before = tables.cameras.len();
        tables.cameras.retain(|c| c.id != id);
        Ok(tables.cameras.len() < before)
    }
}
