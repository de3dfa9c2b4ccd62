//! Infrastructure layer
//!
//! Concrete SQLite-backed implementations of the domain store traits.

pub mod graph;
pub mod vector;

pub use graph::SqliteGraphStore;
pub use vector::SqliteVectorStore;

use crate::config::Config;
use crate::storage::Database;

/// Open both stores at their configured locations, migrating as needed
pub async fn open_stores(config: &Config) -> anyhow::Result<(SqliteGraphStore, SqliteVectorStore)> {
    let graph_db = Database::open_graph(Some(config.graph_store.resolved_path().as_path())).await?;
    let vector_db = Database::open_vector(Some(config.vector_store.resolved_path().as_path())).await?;

    let graph = SqliteGraphStore::new(graph_db.pool().clone())
        .with_max_depth(config.retrieval.max_ancestor_depth);
    let vectors = SqliteVectorStore::new(vector_db.pool().clone());

    tracing::info!(
        graph = %graph_db.path().display(),
        vectors = %vector_db.path().display(),
        "Stores opened"
    );
    Ok((graph, vectors))
}
