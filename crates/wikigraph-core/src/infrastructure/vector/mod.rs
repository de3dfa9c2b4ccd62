//! Vector store implementations

mod sqlite;

pub use sqlite::SqliteVectorStore;
