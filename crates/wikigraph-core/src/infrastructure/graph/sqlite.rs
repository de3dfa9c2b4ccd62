//! SQLite implementation of the GraphStore
//!
//! Nodes are rows keyed by logical ID; the autoincrement row id is the
//! physical ID. Ancestor walks use a recursive CTE over PARENT edges.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::domain::graph::{GraphStore, Node, NodeKind, PhysicalId, Relationship, RelationshipKind};
use crate::error::{Error, Result};

/// Default bound on PARENT hops for ancestor lookups
pub const DEFAULT_MAX_ANCESTOR_DEPTH: u32 = 16;

/// SQLite implementation of the graph store
#[derive(Clone)]
pub struct SqliteGraphStore {
    pool: SqlitePool,
    max_depth: u32,
}

impl SqliteGraphStore {
    /// Create a new SQLite graph store over a migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }

    /// Bound the number of PARENT hops walked by `get_parent_ancestor`
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    async fn node_exists(&self, logical_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM graph_nodes WHERE logical_id = ?")
            .bind(logical_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn create_node(&self, node: &Node) -> Result<PhysicalId> {
        let metadata = serde_json::to_string(&node.relationships)
            .map_err(|e| Error::Other(format!("Failed to serialize relationships: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO graph_nodes (
                logical_id, kind, title, body, media, context,
                needs_embedding, metadata, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node.logical_id)
        .bind(node.kind.as_str())
        .bind(&node.title)
        .bind(&node.body)
        .bind(&node.media)
        .bind(&node.context)
        .bind(node.needs_embedding)
        .bind(&metadata)
        .bind(node.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::StoreWrite(format!("node {} already exists", node.logical_id))
            }
            other => Error::DatabaseError(other),
        })?;

        let physical_id = PhysicalId(result.last_insert_rowid().to_string());
        debug!(logical_id = %node.logical_id, physical_id = %physical_id, kind = %node.kind, "Node created");
        Ok(physical_id)
    }

    async fn create_relationship(
        &self,
        from_logical_id: &str,
        to_logical_id: &str,
        kind: RelationshipKind,
    ) -> Result<()> {
        if !self.node_exists(from_logical_id).await? || !self.node_exists(to_logical_id).await? {
            return Err(Error::dangling(from_logical_id, to_logical_id, kind));
        }

        sqlx::query(
            r#"
            INSERT INTO graph_relationships (from_id, to_id, kind, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(from_id, to_id, kind) DO NOTHING
            "#,
        )
        .bind(from_logical_id)
        .bind(to_logical_id)
        .bind(kind.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Error::dangling(from_logical_id, to_logical_id, kind)
            }
            other => Error::DatabaseError(other),
        })?;

        debug!(from = %from_logical_id, to = %to_logical_id, kind = %kind, "Relationship saved");
        Ok(())
    }

    async fn get_by_logical_id(&self, logical_id: &str) -> Result<Option<Node>> {
        let row: Option<NodeRow> = sqlx::query_as("SELECT * FROM graph_nodes WHERE logical_id = ?")
            .bind(logical_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_node()).transpose()
    }

    async fn get_parent_ancestor(
        &self,
        logical_id: &str,
        content_kinds: &[NodeKind],
    ) -> Result<Option<Node>> {
        if content_kinds.is_empty() {
            return Ok(None);
        }

        let kind_placeholders = content_kinds.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            r#"
            WITH RECURSIVE ancestors(logical_id, depth) AS (
                SELECT to_id, 1
                FROM graph_relationships
                WHERE from_id = ? AND kind = 'PARENT'

                UNION

                SELECT r.to_id, a.depth + 1
                FROM ancestors a
                JOIN graph_relationships r ON r.from_id = a.logical_id AND r.kind = 'PARENT'
                WHERE a.depth < ?
            )
            SELECT n.*
            FROM ancestors a
            JOIN graph_nodes n ON n.logical_id = a.logical_id
            WHERE n.logical_id != ? AND n.kind IN ({})
            ORDER BY a.depth, n.id
            LIMIT 1
            "#,
            kind_placeholders
        );

        let mut query_builder = sqlx::query_as::<_, NodeRow>(&query)
            .bind(logical_id)
            .bind(self.max_depth as i64)
            .bind(logical_id);
        for kind in content_kinds {
            query_builder = query_builder.bind(kind.as_str());
        }

        let row = query_builder.fetch_optional(&self.pool).await?;
        row.map(|r| r.into_node()).transpose()
    }

    async fn list_outgoing(&self, logical_id: &str, kind: RelationshipKind) -> Result<Vec<Relationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(
            "SELECT from_id, to_id, kind FROM graph_relationships WHERE from_id = ? AND kind = ? ORDER BY rowid",
        )
        .bind(logical_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_relationship()).collect()
    }

    async fn count_nodes(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_relationships(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_relationships")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ========== Row Types ==========

#[derive(FromRow)]
struct NodeRow {
    #[allow(dead_code)]
    id: i64,
    logical_id: String,
    kind: String,
    title: String,
    body: String,
    media: Option<String>,
    context: Option<String>,
    needs_embedding: bool,
    metadata: String,
    created_at: String,
}

impl NodeRow {
    fn into_node(self) -> Result<Node> {
        let kind = NodeKind::parse(&self.kind)
            .ok_or_else(|| Error::Other(format!("Invalid node kind: {}", self.kind)))?;

        let relationships: Vec<Relationship> = serde_json::from_str(&self.metadata)
            .map_err(|e| Error::Other(format!("Corrupt metadata for {}: {}", self.logical_id, e)))?;

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Other(format!("Corrupt timestamp for {}: {}", self.logical_id, e)))?;

        Ok(Node {
            logical_id: self.logical_id,
            kind,
            title: self.title,
            body: self.body,
            media: self.media,
            context: self.context,
            needs_embedding: self.needs_embedding,
            embedding: None,
            relationships,
            created_at,
        })
    }
}

#[derive(FromRow)]
struct RelationshipRow {
    from_id: String,
    to_id: String,
    kind: String,
}

impl RelationshipRow {
    fn into_relationship(self) -> Result<Relationship> {
        let kind = RelationshipKind::parse(&self.kind)
            .ok_or_else(|| Error::Other(format!("Invalid relationship kind: {}", self.kind)))?;
        Ok(Relationship::new(self.from_id, self.to_id, kind))
    }
}
