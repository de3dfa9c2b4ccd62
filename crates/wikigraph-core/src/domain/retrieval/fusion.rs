//! Fusion retrieval
//!
//! Runs every expanded query against both vector partitions and merges the
//! per-query rankings with boosted Reciprocal Rank Fusion:
//!
//! ```text
//! score(id) = Σ over lists, Σ over hits of id at rank r:  boost(modality) / (r + k)
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::provider::EmbeddingProvider;
use crate::domain::vector::{Modality, VectorHit, VectorStore};
use crate::error::{Error, Result};

use super::expansion::QueryExpander;

/// RRF normalization constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Weights and limits for fusion
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Rank offset `k` in `boost / (rank + k)`
    pub rrf_k: f64,
    /// Multiplier for hits from the text partition
    pub text_boost: f64,
    /// Multiplier for hits from the image partition
    pub image_boost: f64,
    /// Maximum queries searched at once
    pub concurrency: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            text_boost: 1.5,
            image_boost: 1.0,
            concurrency: 4,
        }
    }
}

impl FusionConfig {
    fn boost(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Text => self.text_boost,
            Modality::Image => self.image_boost,
        }
    }
}

/// A fused result
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub logical_id: String,
    /// Accumulated RRF score
    pub score: f64,
}

/// Merge ranked lists into one deduplicated top-K ranking
///
/// Ties keep first-seen order.
pub fn fuse(lists: &[Vec<VectorHit>], top_k: usize, config: &FusionConfig) -> Vec<FusedHit> {
    let mut fused: Vec<FusedHit> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, hit) in list.iter().enumerate() {
            let contribution = config.boost(hit.payload.modality) / (rank as f64 + config.rrf_k);
            let key = &hit.payload.logical_id;

            match positions.get(key) {
                Some(&pos) => fused[pos].score += contribution,
                None => {
                    positions.insert(key.clone(), fused.len());
                    fused.push(FusedHit {
                        logical_id: key.clone(),
                        score: contribution,
                    });
                }
            }
        }
    }

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    fused.truncate(top_k);
    fused
}

/// Multi-query retriever over the vector store
pub struct FusionRetriever<V: VectorStore> {
    vectors: Arc<V>,
    embedder: Arc<dyn EmbeddingProvider>,
    expander: QueryExpander,
    config: FusionConfig,
}

impl<V: VectorStore> FusionRetriever<V> {
    pub fn new(vectors: Arc<V>, embedder: Arc<dyn EmbeddingProvider>, expander: QueryExpander) -> Self {
        Self {
            vectors,
            embedder,
            expander,
            config: FusionConfig::default(),
        }
    }

    /// Override the fusion weights
    pub fn with_config(mut self, config: FusionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Logical IDs of the best `top_k` fused hits
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(question, top_k)
            .await?
            .into_iter()
            .map(|hit| hit.logical_id)
            .collect())
    }

    /// Fused hits with their scores, best first
    ///
    /// A failing expanded query contributes nothing; a failure of the
    /// original question's own search is a hard error.
    pub async fn retrieve_scored(&self, question: &str, top_k: usize) -> Result<Vec<FusedHit>> {
        let queries = self.expander.expand_or_original(question).await;
        info!(queries = queries.len(), top_k, "Running fusion retrieval");

        let results: Vec<Result<Vec<VectorHit>>> = stream::iter(queries.iter())
            .map(|query| self.search_query(query, top_k))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut lists = Vec::with_capacity(results.len());
        for (idx, result) in results.into_iter().enumerate() {
            match result {
                Ok(hits) => lists.push(hits),
                Err(e) if idx == 0 => {
                    return Err(Error::RetrievalFailed(format!(
                        "search for the original question failed: {e}"
                    )));
                }
                Err(e) => {
                    warn!(query = %queries[idx], error = %e, "Expanded query failed, skipping");
                }
            }
        }

        let fused = fuse(&lists, top_k, &self.config);
        debug!(lists = lists.len(), results = fused.len(), "Fusion complete");
        Ok(fused)
    }

    /// Text hits (top_k) followed by image hits (top_k / 2), re-ranked by similarity
    async fn search_query(&self, query: &str, top_k: usize) -> Result<Vec<VectorHit>> {
        let embedding = self.embedder.embed(query).await?;

        let mut hits = self.vectors.search(&embedding, top_k, Modality::Text).await?;
        let image_k = top_k / 2;
        if image_k > 0 {
            hits.extend(self.vectors.search(&embedding, image_k, Modality::Image).await?);
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(hits)
    }
}
