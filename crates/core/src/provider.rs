//! Provider trait: the abstraction over generation backends.
//!
//! A Provider knows how to send one prompt to a text-generation backend and
//! hand back the raw response body as a stream of byte chunks. Decoding the
//! body into text fragments is the caller's job.
//!
//! Implementations: Ollama `/api/generate`, scripted test providers.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Raw response body, chunk by chunk, in network delivery order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// Body of a generate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "qwen3:4b")
    pub model: String,

    /// Full prompt text, persona included
    pub prompt: String,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl GenerateRequest {
    /// A streaming request whose prompt is `persona`, a blank line, then `prompt`.
    pub fn streaming(model: impl Into<String>, persona: &str, prompt: &str) -> Self {
        Self {
            model: model.into(),
            prompt: format!("{persona}\n\n{prompt}"),
            stream: true,
        }
    }
}

/// The core Provider trait.
///
/// The turn engine calls `generate_stream()` without knowing which backend
/// is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send a request and get the response body as a byte stream.
    ///
    /// Errors returned here mean no body is available at all (bad status,
    /// connection failure). Errors yielded by the stream mean the body broke
    /// off mid-way.
    async fn generate_stream(&self, request: GenerateRequest) -> Result<ByteStream, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
