//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use wikigraph_core::domain::graph::{Node, NodeKind, PageGraphBuilder};
use wikigraph_core::domain::ingest::{DualStoreCoordinator, IngestConfig};
use wikigraph_core::domain::provider::{CompletionProvider, EmbeddingProvider};
use wikigraph_core::infrastructure::{SqliteGraphStore, SqliteVectorStore};
use wikigraph_core::storage::{Database, Schema};
use wikigraph_core::{Error, Result};

/// Terms the keyword embedder counts, one dimension each
pub const VOCAB: &[&str] = &["squirrel", "nut", "seed", "tree", "winter", "fur", "tail", "bird"];

/// Deterministic embedder: one dimension per vocabulary term, valued by occurrence count
///
/// Any text containing `FAIL` is rejected.
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("FAIL") {
            return Err(Error::EmbeddingUnavailable("provider rejected input".to_string()));
        }
        let lower = text.to_lowercase();
        Ok(VOCAB
            .iter()
            .map(|term| lower.matches(term).count() as f32)
            .collect())
    }
}

/// Completion provider returning a fixed answer, or failing
pub struct ScriptedCompletion(pub Option<String>);

impl ScriptedCompletion {
    pub fn answering(text: &str) -> Self {
        Self(Some(text.to_string()))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.0
            .clone()
            .ok_or_else(|| Error::LLMError("completion unavailable".to_string()))
    }
}

pub fn ingest_config() -> IngestConfig {
    IngestConfig {
        concurrency: 4,
        collection: "test".to_string(),
        text_dimensions: VOCAB.len(),
        image_dimensions: 2,
    }
}

/// In-memory graph and vector stores with both partitions prepared
pub async fn memory_stores() -> (Arc<SqliteGraphStore>, Arc<SqliteVectorStore>) {
    let graph_db = Database::in_memory(Schema::Graph).await.unwrap();
    let vector_db = Database::in_memory(Schema::Vector).await.unwrap();

    let graph = Arc::new(SqliteGraphStore::new(graph_db.pool().clone()));
    let vectors = Arc::new(SqliteVectorStore::new(vector_db.pool().clone()));

    coordinator(&graph, &vectors).ensure_collections().await.unwrap();
    (graph, vectors)
}

pub fn coordinator(
    graph: &Arc<SqliteGraphStore>,
    vectors: &Arc<SqliteVectorStore>,
) -> DualStoreCoordinator<SqliteGraphStore, SqliteVectorStore> {
    DualStoreCoordinator::new(graph.clone(), vectors.clone()).with_config(ingest_config())
}

/// IDs of the nodes in [`squirrel_page`]
pub struct SquirrelIds {
    pub page: String,
    pub diet: String,
    pub habitat: String,
    pub chunks: Vec<String>,
    pub summary: String,
    pub image: String,
    pub citation: String,
    pub reference: String,
}

/// A small encyclopedia page with every kind of content the builder supports
pub fn squirrel_page() -> (Vec<Node>, SquirrelIds) {
    let mut builder = PageGraphBuilder::new("Squirrel", "Squirrels are rodents")
        .with_summary("Squirrels are small rodents that live in trees.");

    let diet = builder.add_section("Diet", "Squirrels eat nuts and seeds, storing them for winter.");
    let habitat = builder.add_section("Habitat", "Squirrels live in trees and build nests.");
    let chunks = builder
        .add_chunks(&diet, ["Squirrels eat nuts", "They also eat seeds and bird eggs"])
        .unwrap();
    let summary = builder
        .add_derived(&diet, NodeKind::Summary, "Diet summary", "Nuts and seeds, cached for winter")
        .unwrap();
    let image = builder
        .add_image("Red squirrel", "https://example.org/red-squirrel.jpg", NodeKind::Image)
        .unwrap();
    let citation = builder.add_citation(Some("Diet"), "Nut caching study", "https://example.org/study", false);
    let reference = builder.add_wiki_reference(None, "Rodent", "https://en.wikipedia.org/wiki/Rodent");

    let ids = SquirrelIds {
        page: builder.page_id().to_string(),
        diet,
        habitat,
        chunks,
        summary,
        image,
        citation,
        reference,
    };
    (builder.build(), ids)
}
