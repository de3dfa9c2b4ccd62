//! Embedding and completion provider traits
//!
//! Components receive their providers through their constructors as
//! `Arc<dyn ...>`; nothing in the crate keeps a process-wide model handle.

use async_trait::async_trait;

use crate::error::Result;

/// Turns content into vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed an image by reference
    ///
    /// Image embeddings are not populated by default, so the image partition
    /// stays empty unless a provider overrides this.
    async fn embed_image(&self, _url: &str) -> Result<Option<Vec<f32>>> {
        Ok(None)
    }
}

/// Single-shot text completion
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
