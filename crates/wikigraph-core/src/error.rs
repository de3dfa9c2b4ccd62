//! Error types for Wikigraph

use thiserror::Error;

/// Result type alias using Wikigraph's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Wikigraph error types
///
/// Lookup misses are not errors: store lookups return `Option` and the
/// retrieval pipeline treats an absent node as "no context for this hit".
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check the WIKIGRAPH_API_KEY environment variable.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Store errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Store write rejected: {0}")]
    StoreWrite(String),

    #[error("Dangling {kind} relationship: {from} -> {to} references a missing node")]
    DanglingReference {
        from: String,
        to: String,
        kind: String,
    },

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Retrieval errors (E1200-E1299)
    #[error("Retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::DatabaseError(_) => "E400",
            Self::StoreWrite(_) => "E401",
            Self::DanglingReference { .. } => "E402",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::RetrievalFailed(_) => "E1200",
            Self::EmbeddingUnavailable(_) => "E1201",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether a caller-level retry of the failed operation is reasonable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::RateLimited(_))
    }

    /// Build a dangling-reference error for an edge
    pub fn dangling(from: impl Into<String>, to: impl Into<String>, kind: impl ToString) -> Self {
        Self::DanglingReference {
            from: from.into(),
            to: to.into(),
            kind: kind.to_string(),
        }
    }
}
