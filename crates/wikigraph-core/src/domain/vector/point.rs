//! Vector points, payloads and search hits

use serde::{Deserialize, Serialize};

/// Partition of the vector store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text embeddings
    Text,
    /// Image embeddings
    Image,
}

impl Modality {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    /// Get all modalities
    pub fn all() -> &'static [Modality] {
        &[Self::Text, Self::Image]
    }

    /// Collection name for this partition under a base name
    pub fn collection_name(&self, base: &str) -> String {
        format!("{}_{}", base, self.as_str())
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload stored alongside every vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorPayload {
    /// Logical ID of the node, the only cross-store join key
    pub logical_id: String,
    /// Graph store row the vector was written for
    pub physical_id: String,
    /// Partition the vector lives in
    pub modality: Modality,
}

/// A single similarity search result
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub logical_id: String,
    pub physical_id: String,
    /// Cosine similarity to the query
    pub score: f32,
    pub payload: VectorPayload,
}

/// Cosine similarity between two vectors of equal length
///
/// Returns 0.0 for mismatched lengths or zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Serialize a vector to little-endian bytes for storage
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a vector from little-endian bytes
pub fn vector_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
