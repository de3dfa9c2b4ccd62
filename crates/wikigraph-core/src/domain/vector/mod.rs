//! Vector store domain: modality partitions, payloads and the store contract

mod point;
mod store;

pub use point::{
    Modality, VectorHit, VectorPayload, cosine_similarity, vector_from_bytes, vector_to_bytes,
};
pub use store::VectorStore;
