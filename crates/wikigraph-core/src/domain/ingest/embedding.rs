//! Embedding stage
//!
//! Computes vectors for the nodes flagged as searchable. A provider failure
//! leaves the node without an embedding so the coordinator keeps it out of
//! the vector store; the rest of the batch carries on.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::domain::graph::Node;
use crate::domain::provider::EmbeddingProvider;
use crate::domain::vector::Modality;
use crate::error::{Error, Result};

/// Summary of one embedding run
#[derive(Debug, Default, Clone)]
pub struct EmbeddingReport {
    /// Nodes that received a vector
    pub embedded: usize,
    /// Nodes not flagged as searchable, or with nothing to embed
    pub skipped: usize,
    /// Logical IDs whose provider call failed
    pub failed: Vec<String>,
}

/// Fills `Node::embedding` for searchable nodes
pub struct EmbeddingStage {
    provider: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
}

impl EmbeddingStage {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            concurrency: 8,
        }
    }

    /// Set the number of concurrent provider calls
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Embed every node with `needs_embedding`, clearing vectors on all others
    pub async fn run(&self, nodes: &mut [Node]) -> EmbeddingReport {
        let mut report = EmbeddingReport::default();
        let mut jobs = Vec::new();

        for (idx, node) in nodes.iter_mut().enumerate() {
            if !node.needs_embedding {
                node.embedding = None;
                report.skipped += 1;
                continue;
            }
            let input = match node.modality() {
                Modality::Text => Some(node.body.clone()).filter(|b| !b.trim().is_empty()),
                Modality::Image => node.media.clone(),
            };
            match input {
                Some(input) => jobs.push((idx, node.modality(), input)),
                None => {
                    node.embedding = None;
                    report.skipped += 1;
                }
            }
        }

        info!(jobs = jobs.len(), "Computing embeddings");

        let provider = &self.provider;
        let results: Vec<(usize, Result<Option<Vec<f32>>>)> = stream::iter(jobs)
            .map(|(idx, modality, input)| async move {
                let result = match modality {
                    Modality::Text => provider.embed(&input).await.map(Some),
                    Modality::Image => provider.embed_image(&input).await,
                };
                (idx, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (idx, result) in results {
            let node = &mut nodes[idx];
            match result {
                Ok(Some(vector)) => {
                    debug!(logical_id = %node.logical_id, dimensions = vector.len(), "Node embedded");
                    node.embedding = Some(vector);
                    report.embedded += 1;
                }
                Ok(None) => {
                    node.embedding = None;
                    report.skipped += 1;
                }
                Err(e) => {
                    let err = Error::EmbeddingUnavailable(e.to_string());
                    warn!(logical_id = %node.logical_id, error = %err, "Excluding node from vector store");
                    node.embedding = None;
                    report.failed.push(node.logical_id.clone());
                }
            }
        }

        report
    }
}
