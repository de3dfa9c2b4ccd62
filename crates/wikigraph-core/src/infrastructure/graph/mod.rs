//! Graph store implementations

mod sqlite;

pub use sqlite::{DEFAULT_MAX_ANCESTOR_DEPTH, SqliteGraphStore};
