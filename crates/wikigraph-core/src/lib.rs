//! Wikigraph Core Library
//!
//! This crate provides the core functionality for Wikigraph, including:
//! - Typed knowledge graph of page content (sections, chunks, images, derived nodes)
//! - Dual-store persistence (graph store for structure, vector store for similarity)
//! - Multi-query fusion retrieval with reciprocal rank fusion
//! - Parent resolution of low-level hits to content-bearing units
//! - SQLite-backed stores and an OpenAI-compatible LLM client

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod llm;
pub mod logging;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::graph::{GraphStore, Node, NodeKind, PageGraphBuilder, RelationshipKind};
    pub use crate::domain::ingest::{DualStoreCoordinator, EmbeddingStage, PersistOutcome};
    pub use crate::domain::provider::{CompletionProvider, EmbeddingProvider};
    pub use crate::domain::retrieval::{
        FusionRetriever, ParentResolver, QueryExpander, RetrievalService, RetrievedContext,
    };
    pub use crate::domain::vector::{Modality, VectorStore};
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::{SqliteGraphStore, SqliteVectorStore};
}
