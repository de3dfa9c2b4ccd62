//! Fusion retrieval domain module
//!
//! ## Architecture
//!
//! ```text
//! question → QueryExpander → [q0 = question, q1..qn]
//!          → FusionRetriever (text top_k + image top_k/2 per query, boosted RRF)
//!          → ParentResolver (nearest section / subsection / image / plot)
//!          → assemble → (text, image_refs)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let expander = QueryExpander::new(llm.clone());
//! let retriever = FusionRetriever::new(vectors, embedder, expander);
//! let service = RetrievalService::new(retriever, ParentResolver::new(graph));
//! let retrieved = service.query("What do squirrels eat?").await?;
//! println!("{}", retrieved.context.text);
//! ```

mod context;
mod expansion;
mod fusion;
mod resolver;
mod service;

pub use context::{AssembledContext, assemble};
pub use expansion::{DEFAULT_NUM_QUERIES, QueryExpander, parse_queries};
pub use fusion::{DEFAULT_RRF_K, FusedHit, FusionConfig, FusionRetriever, fuse};
pub use resolver::ParentResolver;
pub use service::{RetrievalService, RetrievedContext};
