use bytes::Bytes;
use sqlx::SqlitePool;
use thiserror::Error;

use super::models::{MemePatch, MemeRecord};
use crate::gateway::{BlobGateway, GatewayError, ObjectSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Meme not found")]
    NotFound,
    #[error("Blob store could not process the upload")]
    Unprocessable,
    #[error("Gateway error: {0}")]
    Gateway(GatewayError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<GatewayError> for RepoError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unprocessable => RepoError::Unprocessable,
            other => RepoError::Gateway(other),
        }
    }
}

/// Owns the catalog rows and keeps them convergent with the blob store.
///
/// Constructed per request: the pool hands out a connection per query, so
/// no session state leaks across concurrent requests. The blob store stays
/// authoritative for bytes and timestamps; every write here happens only
/// after the gateway reports a successful blob-side result.
pub struct MemeRepository {
    pool: SqlitePool,
    gateway: BlobGateway,
}

const SELECT_COLUMNS: &str = "id, name, description, last_updated_at";

impl MemeRepository {
    pub fn new(pool: SqlitePool, gateway: BlobGateway) -> Self {
        Self { pool, gateway }
    }

    /// Insert-or-update keyed by `name`, folding the blob store's reported
    /// state into the catalog. Every synchronized field overwrites the
    /// existing value (last writer wins); `id` is never touched.
    ///
    /// The lookup and the write are two separate statements with no
    /// serializing transaction around them, so two concurrent creates for
    /// the same new name can race into duplicate rows. The first match (by
    /// id) wins on later lookups.
    async fn upsert(&self, synced: &ObjectSummary) -> Result<MemeRecord, RepoError> {
        let existing = sqlx::query_as::<_, MemeRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM memes WHERE name = ? ORDER BY id LIMIT 1"
        ))
        .bind(&synced.name)
        .fetch_optional(&self.pool)
        .await?;

        let record = match existing {
            Some(row) => {
                sqlx::query_as::<_, MemeRecord>(&format!(
                    "UPDATE memes SET description = ?, last_updated_at = ? WHERE id = ? \
                     RETURNING {SELECT_COLUMNS}"
                ))
                .bind(&synced.description)
                .bind(synced.last_updated_at)
                .bind(row.id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, MemeRecord>(&format!(
                    "INSERT INTO memes (name, description, last_updated_at) VALUES (?, ?, ?) \
                     RETURNING {SELECT_COLUMNS}"
                ))
                .bind(&synced.name)
                .bind(&synced.description)
                .bind(synced.last_updated_at)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(record)
    }

    /// Upload through the gateway, then reconcile the catalog row. A failed
    /// blob write leaves the catalog untouched; no partial rows.
    pub async fn create(
        &self,
        name: &str,
        data: Bytes,
        description: &str,
    ) -> Result<MemeRecord, RepoError> {
        let synced = self.gateway.create_or_update(name, data, description).await?;

        let record = self.upsert(&synced).await?;
        tracing::info!(name = %record.name, id = record.id, "Meme added");
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<MemeRecord, RepoError> {
        sqlx::query_as::<_, MemeRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM memes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<MemeRecord>, RepoError> {
        let records = sqlx::query_as::<_, MemeRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM memes ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Catalog-only metadata edit. The blob store is deliberately not
    /// consulted: the stored object keeps whatever description it was
    /// uploaded with, and only the catalog row diverges.
    pub async fn update(&self, id: i64, patch: MemePatch) -> Result<MemeRecord, RepoError> {
        let mut record = self.get(id).await?;

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(last_updated_at) = patch.last_updated_at {
            record.last_updated_at = last_updated_at;
        }

        let record = sqlx::query_as::<_, MemeRecord>(&format!(
            "UPDATE memes SET name = ?, description = ?, last_updated_at = ? WHERE id = ? \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.last_updated_at)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(name = %record.name, id = record.id, "Meme updated");
        Ok(record)
    }

    /// Remove the blob first, then the catalog row. The blob leg is
    /// best-effort: if the gateway call fails the row is removed anyway,
    /// trading a possibly-orphaned blob for never leaving a catalog row
    /// that points at nothing.
    pub async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let record = self.get(id).await?;

        if let Err(e) = self.gateway.delete_object(&record.name).await {
            tracing::warn!(name = %record.name, error = %e, "Blob delete failed; removing catalog row anyway");
        }

        sqlx::query("DELETE FROM memes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(name = %record.name, id = record.id, "Meme deleted");
        Ok(())
    }
}
