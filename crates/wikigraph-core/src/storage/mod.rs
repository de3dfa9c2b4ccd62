//! Storage layer - SQLite
//!
//! Provides database management and migrations for the graph store and the
//! vector store, which live in separate database files.
//!
//! # Architecture
//!
//! - `database`: Connection pool management and initialization
//! - `migrations`: Per-store schema versioning and automatic migration
//!
//! # Usage
//!
//! ```ignore
//! use wikigraph_core::storage::{Database, Schema};
//!
//! let graph = Database::in_memory(Schema::Graph).await?;
//! let vectors = Database::open_vector(None).await?;
//! ```

pub mod database;
pub mod migrations;

pub use database::{Database, DatabaseConfig, default_database_path};
pub use migrations::{
    GRAPH_SCHEMA_VERSION, MigrationStatus, Schema, VECTOR_SCHEMA_VERSION, migration_status,
    run_graph_migrations, run_migrations, run_vector_migrations,
};
