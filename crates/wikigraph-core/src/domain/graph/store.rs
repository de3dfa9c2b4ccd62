//! Graph store trait
//!
//! Defines the structural contract a graph store must satisfy. The trait
//! abstracts over different storage backends (SQLite, property-graph servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::node::{Node, NodeKind};
use super::relationship::{Relationship, RelationshipKind};

/// Identifier assigned by the graph store on insertion
///
/// Only the dual-store coordinator and the vector payload carry it; everything
/// else joins on the logical ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalId(pub String);

impl PhysicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhysicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence and traversal for nodes and typed edges
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert a node
    ///
    /// Fails with `Error::StoreWrite` if the logical ID already exists.
    async fn create_node(&self, node: &Node) -> Result<PhysicalId>;

    /// Insert an edge between two existing nodes
    ///
    /// Fails with `Error::DanglingReference` if either endpoint is absent.
    /// Submitting the same edge twice leaves a single edge.
    async fn create_relationship(
        &self,
        from_logical_id: &str,
        to_logical_id: &str,
        kind: RelationshipKind,
    ) -> Result<()>;

    /// Point lookup by logical ID
    async fn get_by_logical_id(&self, logical_id: &str) -> Result<Option<Node>>;

    /// Nearest PARENT ancestor whose kind is in `content_kinds`
    ///
    /// The start node itself is never returned. Returns `None` when the chain
    /// ends, or exceeds the store's depth bound, before a match.
    async fn get_parent_ancestor(
        &self,
        logical_id: &str,
        content_kinds: &[NodeKind],
    ) -> Result<Option<Node>>;

    /// Edges of one kind leaving a node
    async fn list_outgoing(&self, logical_id: &str, kind: RelationshipKind) -> Result<Vec<Relationship>>;

    async fn count_nodes(&self) -> Result<u64>;

    async fn count_relationships(&self) -> Result<u64>;
}
