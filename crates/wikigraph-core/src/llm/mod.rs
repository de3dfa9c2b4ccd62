//! LLM integration - OpenAI-compatible API
//!
//! This module provides:
//! - HTTP client for chat completions and embeddings
//! - Request/response types matching the OpenAI wire format
//! - Provider trait implementations used by ingest and retrieval

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, EmbeddingData, EmbeddingInput, EmbeddingRequest,
    EmbeddingResponse, FinishReason, Message, MessageRole, Usage,
};
