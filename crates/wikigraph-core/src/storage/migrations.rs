//! Database migrations for the graph and vector stores
//!
//! Each store lives in its own SQLite file with its own version track.
//! Applied versions are recorded in a `_migrations` table per database.

use sqlx::SqlitePool;

/// Latest graph schema version
pub const GRAPH_SCHEMA_VERSION: i32 = 2;

/// Latest vector schema version
pub const VECTOR_SCHEMA_VERSION: i32 = 1;

/// Which store a database holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Graph,
    Vector,
}

impl Schema {
    pub fn target_version(&self) -> i32 {
        match self {
            Self::Graph => GRAPH_SCHEMA_VERSION,
            Self::Vector => VECTOR_SCHEMA_VERSION,
        }
    }

    fn steps(&self) -> &'static [(i32, &'static str, &'static str)] {
        match self {
            Self::Graph => &[
                (1, "Graph nodes and relationships", GRAPH_MIGRATION_V1),
                (2, "Traversal indexes", GRAPH_MIGRATION_V2),
            ],
            Self::Vector => &[(1, "Vector collections and points", VECTOR_MIGRATION_V1)],
        }
    }
}

/// Migrations table creation
const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Graph v1: nodes keyed by logical ID, typed edges keyed by endpoints and kind
const GRAPH_MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS graph_nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    logical_id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL DEFAULT '',
    media TEXT,
    context TEXT,
    needs_embedding INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_relationships (
    from_id TEXT NOT NULL REFERENCES graph_nodes(logical_id),
    to_id TEXT NOT NULL REFERENCES graph_nodes(logical_id),
    kind TEXT NOT NULL CHECK (kind IN ('PARENT', 'SOURCE', 'NEXT', 'PREVIOUS')),
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (from_id, to_id, kind)
);
"#;

/// Graph v2: indexes for ancestor walks and kind filters
const GRAPH_MIGRATION_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_graph_relationships_from_kind
    ON graph_relationships(from_id, kind);
CREATE INDEX IF NOT EXISTS idx_graph_relationships_to
    ON graph_relationships(to_id);
CREATE INDEX IF NOT EXISTS idx_graph_nodes_kind
    ON graph_nodes(kind);
"#;

/// Vector v1: one partition per modality, one point per node and modality
const VECTOR_MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS vector_collections (
    modality TEXT PRIMARY KEY CHECK (modality IN ('text', 'image')),
    name TEXT NOT NULL UNIQUE,
    dimensions INTEGER NOT NULL CHECK (dimensions > 0),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS vector_points (
    logical_id TEXT NOT NULL,
    modality TEXT NOT NULL REFERENCES vector_collections(modality),
    physical_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    payload TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (logical_id, modality)
);

CREATE INDEX IF NOT EXISTS idx_vector_points_modality ON vector_points(modality);
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations for a schema
pub async fn run_migrations(pool: &SqlitePool, schema: Schema) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        schema = ?schema,
        current_version = current_version,
        target_version = schema.target_version(),
        "Checking database migrations"
    );

    if current_version >= schema.target_version() {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    for (version, description, sql) in schema.steps() {
        if current_version < *version {
            tracing::info!(version = *version, "Applying migration: {}", description);
            sqlx::raw_sql(sql).execute(pool).await?;
            record_migration(pool, *version).await?;
        }
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Run all pending graph store migrations
pub async fn run_graph_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    run_migrations(pool, Schema::Graph).await
}

/// Run all pending vector store migrations
pub async fn run_vector_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    run_migrations(pool, Schema::Vector).await
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool, schema: Schema) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: schema.target_version(),
        needs_migration: current_version < schema.target_version(),
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    #[tokio::test]
    async fn test_run_graph_migrations() {
        let pool = create_test_pool().await;

        let status = migration_status(&pool, Schema::Graph).await.unwrap();
        assert_eq!(status.current_version, 0);
        assert!(status.needs_migration);

        run_graph_migrations(&pool).await.unwrap();

        let status = migration_status(&pool, Schema::Graph).await.unwrap();
        assert_eq!(status.current_version, GRAPH_SCHEMA_VERSION);
        assert!(!status.needs_migration);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = create_test_pool().await;

        run_vector_migrations(&pool).await.unwrap();
        run_vector_migrations(&pool).await.unwrap();

        let status = migration_status(&pool, Schema::Vector).await.unwrap();
        assert_eq!(status.current_version, VECTOR_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_tables_created() {
        let graph = create_test_pool().await;
        run_graph_migrations(&graph).await.unwrap();
        let vector = create_test_pool().await;
        run_vector_migrations(&vector).await.unwrap();

        for (pool, table) in [
            (&graph, "graph_nodes"),
            (&graph, "graph_relationships"),
            (&vector, "vector_collections"),
            (&vector, "vector_points"),
        ] {
            let result: (i32,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(pool)
                .await
                .unwrap_or_else(|_| panic!("Table {} should exist", table));
            assert_eq!(result.0, 0, "Table {} should be empty", table);
        }
    }

    #[tokio::test]
    async fn test_relationship_kind_is_checked() {
        let pool = create_test_pool().await;
        run_graph_migrations(&pool).await.unwrap();

        let result = sqlx::query("INSERT INTO graph_relationships (from_id, to_id, kind) VALUES ('a', 'b', 'CHILD')")
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }
}
