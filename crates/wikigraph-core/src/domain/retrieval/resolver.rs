//! Parent resolution
//!
//! Maps fine-grained hits (chunks, summaries, descriptions) back to the
//! nearest content-bearing structural unit they belong to.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::domain::graph::{GraphStore, Node, NodeKind};
use crate::error::Result;

/// Resolves hits to their nearest content-bearing ancestors
pub struct ParentResolver<G: GraphStore> {
    graph: Arc<G>,
    content_kinds: Vec<NodeKind>,
    concurrency: usize,
}

impl<G: GraphStore> ParentResolver<G> {
    /// Resolver targeting sections, subsections, images and plots
    pub fn new(graph: Arc<G>) -> Self {
        Self {
            graph,
            content_kinds: NodeKind::content_bearing().to_vec(),
            concurrency: 4,
        }
    }

    /// Override the kinds that count as context
    pub fn with_content_kinds(mut self, kinds: Vec<NodeKind>) -> Self {
        self.content_kinds = kinds;
        self
    }

    /// Set the number of concurrent lookups
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ancestors for each ID, deduplicated in first-seen order
    ///
    /// IDs without a matching ancestor are skipped. Store errors propagate.
    pub async fn resolve(&self, logical_ids: &[String]) -> Result<Vec<Node>> {
        let kinds = &self.content_kinds;
        let ancestors: Vec<Option<Node>> = stream::iter(logical_ids)
            .map(|id| self.graph.get_parent_ancestor(id, kinds))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut seen = HashSet::new();
        let resolved: Vec<Node> = ancestors
            .into_iter()
            .flatten()
            .filter(|node| seen.insert(node.logical_id.clone()))
            .collect();

        debug!(hits = logical_ids.len(), resolved = resolved.len(), "Parents resolved");
        Ok(resolved)
    }
}
