//! Domain layer
//!
//! Contains the data model, store contracts, and the ingest and retrieval
//! algorithms. Nothing here depends on a concrete store or provider.

pub mod graph;
pub mod ingest;
pub mod provider;
pub mod retrieval;
pub mod vector;
