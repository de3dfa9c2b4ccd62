//! Vector store trait
//!
//! Abstracts over the similarity-search backend. Implementations hold one
//! partition per [`Modality`], each sized to its embedding model.

use async_trait::async_trait;

use crate::error::Result;

use super::point::{Modality, VectorHit};

/// Persistence and similarity search for node embeddings
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the partition for `modality` if missing, or verify its dimensionality
    async fn ensure_collection(&self, modality: Modality, name: &str, dimensions: usize) -> Result<()>;

    /// Store or replace the vector for a node
    ///
    /// Retrying the same upsert overwrites the previous point.
    async fn upsert(
        &self,
        logical_id: &str,
        physical_id: &str,
        embedding: &[f32],
        modality: Modality,
    ) -> Result<()>;

    /// Top-K cosine search in one partition, best first
    ///
    /// An empty or missing partition yields an empty list.
    async fn search(&self, query: &[f32], top_k: usize, modality: Modality) -> Result<Vec<VectorHit>>;

    /// Number of points stored in a partition
    async fn count(&self, modality: Modality) -> Result<u64>;
}
