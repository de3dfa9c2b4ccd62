//! Retrieval service
//!
//! Chains fusion retrieval, parent resolution and context assembly.

use tracing::info;

use crate::domain::graph::{GraphStore, Node};
use crate::domain::vector::VectorStore;
use crate::error::Result;

use super::context::{AssembledContext, assemble};
use super::fusion::{FusedHit, FusionRetriever};
use super::resolver::ParentResolver;

/// Everything retrieved for one question
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Fused hits, best first
    pub hits: Vec<FusedHit>,
    /// Deduplicated content-bearing ancestors of the hits
    pub nodes: Vec<Node>,
    pub context: AssembledContext,
}

/// Question-to-context pipeline
pub struct RetrievalService<G: GraphStore, V: VectorStore> {
    retriever: FusionRetriever<V>,
    resolver: ParentResolver<G>,
    top_k: usize,
}

impl<G: GraphStore, V: VectorStore> RetrievalService<G, V> {
    pub fn new(retriever: FusionRetriever<V>, resolver: ParentResolver<G>) -> Self {
        Self {
            retriever,
            resolver,
            top_k: 10,
        }
    }

    /// Set the number of fused hits to resolve
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Retrieve and assemble context for a question
    pub async fn query(&self, question: &str) -> Result<RetrievedContext> {
        let hits = self.retriever.retrieve_scored(question, self.top_k).await?;
        let ids: Vec<String> = hits.iter().map(|h| h.logical_id.clone()).collect();
        let nodes = self.resolver.resolve(&ids).await?;
        let context = assemble(&nodes);

        info!(
            hits = hits.len(),
            nodes = nodes.len(),
            images = context.image_refs.split_whitespace().count(),
            "Context retrieved"
        );

        Ok(RetrievedContext { hits, nodes, context })
    }

    /// Retrieve context and render the answer prompt
    pub async fn answer_prompt(&self, question: &str) -> Result<String> {
        Ok(self.query(question).await?.context.answer_prompt(question))
    }
}
