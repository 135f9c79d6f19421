//! Trait seams over the repositories.
//!
//! The pipeline and the HTTP handlers hold `Arc<dyn IncidentStore>` and
//! `Arc<dyn CameraStore>`. Production wires both to [`PgStore`]; tests use
//! the in-memory implementation from [`crate::testing`].

use async_trait::async_trait;
use crashwatch_core::types::DbId;

use crate::models::camera::{Camera, CreateCamera, UpdateCamera};
use crate::models::incident::{CreateIncident, Incident, IncidentFilter, ReviewIncident};
use crate::repositories::{CameraRepo, IncidentRepo};
use crate::DbPool;

/// Error type shared by all store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Backend unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for incident records.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert(&self, input: &CreateIncident) -> Result<Incident, StoreError>;
    async fn get(&self, id: DbId) -> Result<Option<Incident>, StoreError>;
    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError>;
    async fn review(
        &self,
        id: DbId,
        input: &ReviewIncident,
    ) -> Result<Option<Incident>, StoreError>;
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;
    /// Cheap reachability probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Read/write access to the camera registry.
#[async_trait]
pub trait CameraStore: Send + Sync {
    async fn create(&self, input: &CreateCamera) -> Result<Camera, StoreError>;
    async fn get(&self, id: DbId) -> Result<Option<Camera>, StoreError>;
    async fn list(&self) -> Result<Vec<Camera>, StoreError>;
    async fn list_working(&self) -> Result<Vec<Camera>, StoreError>;
    async fn update(&self, id: DbId, input: &UpdateCamera) -> Result<Option<Camera>, StoreError>;
    async fn delete(&self, id: DbId) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// Store backed by the PostgreSQL repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn insert(&self, input: &CreateIncident) -> Result<Incident, StoreError> {
        Ok(IncidentRepo::create(&self.pool, input).await?)
    }

    async fn get(&self, id: DbId) -> Result<Option<Incident>, StoreError> {
        Ok(IncidentRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
        Ok(IncidentRepo::list(&self.pool, filter).await?)
    }

    async fn review(
        &self,
        id: DbId,
        input: &ReviewIncident,
    ) -> Result<Option<Incident>, StoreError> {
        Ok(IncidentRepo::review(&self.pool, id, input).await?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(IncidentRepo::delete(&self.pool, id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }
}

#[async_trait]
impl CameraStore for PgStore {
    async fn create(&self, input: &CreateCamera) -> Result<Camera, StoreError> {
        Ok(CameraRepo::create(&self.pool, input).await?)
    }

    async fn get(&self, id: DbId) -> Result<Option<Camera>, StoreError> {
        Ok(CameraRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list(&self) -> Result<Vec<Camera>, StoreError> {
        Ok(CameraRepo::list(&self.pool).await?)
    }

    async fn list_working(&self) -> Result<Vec<Camera>, StoreError> {
        Ok(CameraRepo::list_working(&self.pool).await?)
    }

    async fn update(&self, id: DbId, input: &UpdateCamera) -> Result<Option<Camera>, StoreError> {
        Ok(CameraRepo::update(&self.pool, id, input).await?)
    }

    async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(CameraRepo::delete(&self.pool, id).await?)
    }
}
