//! Ingestion: embedding and dual-store persistence of node batches
//!
//! ```text
//! PageGraphBuilder → EmbeddingStage → DualStoreCoordinator
//!                                      ├─ 1. graph nodes (pages first)
//!                                      ├─ 2. graph relationships
//!                                      └─ 3. vectors for embedded nodes
//! ```

mod coordinator;
mod embedding;

pub use coordinator::{DualStoreCoordinator, IngestConfig, PersistOutcome};
pub use embedding::{EmbeddingReport, EmbeddingStage};
