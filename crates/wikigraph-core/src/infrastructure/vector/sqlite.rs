//! SQLite implementation of the VectorStore
//!
//! Vectors are stored as little-endian f32 BLOBs. Search is brute-force
//! cosine similarity over one modality partition.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};

use crate::domain::vector::{
    Modality, VectorHit, VectorPayload, VectorStore, cosine_similarity, vector_from_bytes,
    vector_to_bytes,
};
use crate::error::{Error, Result};

/// SQLite implementation of the vector store
#[derive(Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store over a migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn collection_dimensions(&self, modality: Modality) -> Result<Option<usize>> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT dimensions FROM vector_collections WHERE modality = ?")
                .bind(modality.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(d,)| d as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn ensure_collection(&self, modality: Modality, name: &str, dimensions: usize) -> Result<()> {
        if dimensions == 0 {
            return Err(Error::InvalidInput(format!(
                "collection {} needs a positive dimensionality",
                name
            )));
        }

        if let Some(existing) = self.collection_dimensions(modality).await? {
            if existing != dimensions {
                return Err(Error::StoreWrite(format!(
                    "{} collection has {} dimensions, expected {}",
                    modality, existing, dimensions
                )));
            }
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO vector_collections (modality, name, dimensions) VALUES (?, ?, ?) ON CONFLICT(modality) DO NOTHING",
        )
        .bind(modality.as_str())
        .bind(name)
        .bind(dimensions as i64)
        .execute(&self.pool)
        .await?;

        debug!(modality = %modality, name = %name, dimensions, "Vector collection created");
        Ok(())
    }

    async fn upsert(
        &self,
        logical_id: &str,
        physical_id: &str,
        embedding: &[f32],
        modality: Modality,
    ) -> Result<()> {
        let dimensions = self.collection_dimensions(modality).await?.ok_or_else(|| {
            Error::StoreWrite(format!("no {} collection to write {} into", modality, logical_id))
        })?;

        if embedding.len() != dimensions {
            return Err(Error::StoreWrite(format!(
                "vector for {} has {} dimensions, {} collection expects {}",
                logical_id,
                embedding.len(),
                modality,
                dimensions
            )));
        }

        let payload = VectorPayload {
            logical_id: logical_id.to_string(),
            physical_id: physical_id.to_string(),
            modality,
        };
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| Error::Other(format!("Failed to serialize payload: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO vector_points (logical_id, modality, physical_id, embedding, payload, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(logical_id, modality) DO UPDATE SET
                physical_id = excluded.physical_id,
                embedding = excluded.embedding,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(logical_id)
        .bind(modality.as_str())
        .bind(physical_id)
        .bind(vector_to_bytes(embedding))
        .bind(&payload_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(logical_id = %logical_id, modality = %modality, "Vector upserted");
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize, modality: Modality) -> Result<Vec<VectorHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<PointRow> = sqlx::query_as(
            "SELECT logical_id, physical_id, embedding, payload FROM vector_points WHERE modality = ?",
        )
        .bind(modality.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<VectorHit> = rows
            .into_iter()
            .filter_map(|row| {
                let embedding = vector_from_bytes(&row.embedding)?;
                if embedding.len() != query.len() {
                    warn!(logical_id = %row.logical_id, "Skipping vector with mismatched dimensions");
                    return None;
                }
                let score = cosine_similarity(query, &embedding);
                let payload = serde_json::from_str(&row.payload).unwrap_or_else(|_| VectorPayload {
                    logical_id: row.logical_id.clone(),
                    physical_id: row.physical_id.clone(),
                    modality,
                });
                Some(VectorHit {
                    logical_id: row.logical_id,
                    physical_id: row.physical_id,
                    score,
                    payload,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        debug!(modality = %modality, top_k, results = hits.len(), "Vector search completed");
        Ok(hits)
    }

    async fn count(&self, modality: Modality) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vector_points WHERE modality = ?")
            .bind(modality.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[derive(FromRow)]
struct PointRow {
    logical_id: String,
    physical_id: String,
    embedding: Vec<u8>,
    payload: String,
}
