//! Repository for the `incidents` table.

use crashwatch_core::incident::IncidentStatus;
use crashwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::incident::{CreateIncident, Incident, IncidentFilter, ReviewIncident};

/// Column list for `incidents` queries.
const COLUMNS: &str = "\
    id, time_detected, camera_id, camera_name, camera_address, location, \
    status, is_false_alarm, processed_by, screenshot, dedup_key, \
    created_at, updated_at";

/// Provides persistence for escalated incidents and their review state.
pub struct IncidentRepo;

impl IncidentRepo {
    /// Insert a new `pending` incident.
    ///
    /// Idempotent on `dedup_key`: if a row with the same key already exists
    /// (an earlier attempt that committed but whose response was lost), that
    /// row is returned instead of a duplicate.
    pub async fn create(pool: &PgPool, input: &CreateIncident) -> Result<Incident, sqlx::Error> {
        let query = format!(
            "INSERT INTO incidents \
                (time_detected, camera_id, camera_name, camera_address, location, \
                 status, is_false_alarm, screenshot, dedup_key) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8) \
             ON CONFLICT (dedup_key) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Incident>(&query)
            .bind(input.time_detected)
            .bind(input.camera_id)
            .bind(&input.camera_details.name)
            .bind(&input.camera_details.address)
            .bind(&input.location)
            .bind(IncidentStatus::Pending.as_str())
            .bind(&input.screenshot)
            .bind(&input.dedup_key)
            .fetch_optional(pool)
            .await?;

        match inserted {
            Some(incident) => Ok(incident),
            None => {
                let query = format!("SELECT {COLUMNS} FROM incidents WHERE dedup_key = $1");
                sqlx::query_as::<_, Incident>(&query)
                    .bind(&input.dedup_key)
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// Find an incident by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM incidents WHERE id = $1");
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List incidents matching `filter`, newest first.
    pub async fn list(pool: &PgPool, filter: &IncidentFilter) -> Result<Vec<Incident>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM incidents \
             WHERE ($1::BIGINT IS NULL OR camera_id = $1) \
               AND ($2::TEXT IS NULL OR status = $2) \
               AND ($3::TEXT IS NULL OR processed_by = $3) \
             ORDER BY time_detected DESC, id DESC"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(filter.camera_id)
            .bind(filter.status.map(IncidentStatus::as_str))
            .bind(filter.processed_by.as_deref())
            .fetch_all(pool)
            .await
    }

    /// Record an operator review.
    ///
    /// Returns `None` if no incident with the given `id` exists.
    pub async fn review(
        pool: &PgPool,
        id: DbId,
        input: &ReviewIncident,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET \
                status = $2, \
                is_false_alarm = $3, \
                processed_by = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(input.status().as_str())
            .bind(input.is_false_alarm)
            .bind(&input.processed_by)
            .fetch_optional(pool)
            .await
    }

    /// Delete an incident. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
