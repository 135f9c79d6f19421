//! Repository for the `cameras` table.

use crashwatch_core::camera::CameraStatus;
use crashwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::camera::{Camera, CreateCamera, UpdateCamera};

/// Column list for `cameras` queries.
const COLUMNS: &str = "\
    id, name, city, district, ward, street, full_address, stream_url, \
    description, latitude, longitude, status, created_at, updated_at";

/// Provides CRUD operations for registered cameras.
pub struct CameraRepo;

impl CameraRepo {
    /// Insert a new camera, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateCamera) -> Result<Camera, sqlx::Error> {
        let query = format!(
            "INSERT INTO cameras \
                (name, city, district, ward, street, full_address, stream_url, \
                 description, latitude, longitude, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Camera>(&query)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.district)
            .bind(&input.ward)
            .bind(&input.street)
            .bind(&input.full_address)
            .bind(&input.stream_url)
            .bind(&input.description)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.status_or_default())
            .fetch_one(pool)
            .await
    }

    /// Find a camera by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Camera>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cameras WHERE id = $1");
        sqlx::query_as::<_, Camera>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every camera ordered by ID.
    pub async fn list(pool: &PgPool) -> Result<Vec<Camera>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cameras ORDER BY id");
        sqlx::query_as::<_, Camera>(&query).fetch_all(pool).await
    }

    /// List cameras in the `working` state.
    pub async fn list_working(pool: &PgPool) -> Result<Vec<Camera>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM cameras WHERE status = $1 ORDER BY id");
        sqlx::query_as::<_, Camera>(&query)
            .bind(CameraStatus::Working.as_str())
            .fetch_all(pool)
            .await
    }

    /// Update a camera. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no camera with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCamera,
    ) -> Result<Option<Camera>, sqlx::Error> {
        let query = format!(
            "UPDATE cameras SET \
                name = COALESCE($2, name), \
                city = COALESCE($3, city), \
                district = COALESCE($4, district), \
                ward = COALESCE($5, ward), \
                street = COALESCE($6, street), \
                full_address = COALESCE($7, full_address), \
                stream_url = COALESCE($8, stream_url), \
                description = COALESCE($9, description), \
                latitude = COALESCE($10, latitude), \
                longitude = COALESCE($11, longitude), \
                status = COALESCE($12, status) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Camera>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.city)
            .bind(&input.district)
            .bind(&input.ward)
            .bind(&input.street)
            .bind(&input.full_address)
            .bind(&input.stream_url)
            .bind(&input.description)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Delete a camera. Incidents keep their denormalized details.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cameras WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
