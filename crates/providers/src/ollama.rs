//! Ollama provider implementation.
//!
//! Talks to Ollama's native `/api/generate` endpoint (or anything serving the
//! same newline-delimited JSON protocol). Supports:
//! - Streaming generation, handed back as the raw byte stream
//! - Model listing via `/api/tags` and health checks

use async_trait::async_trait;
use futures::StreamExt;
use parley_core::error::ProviderError;
use parley_core::provider::{ByteStream, GenerateRequest, Provider};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// An Ollama-compatible generation backend.
pub struct OllamaProvider {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider posting to `endpoint` (the full `/api/generate` URL).
    ///
    /// `read_timeout` bounds each wait for response bytes, not the whole
    /// response, so a long generation that keeps streaming is never cut off.
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "ollama".into(),
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Create a provider for a local Ollama (convenience constructor).
    pub fn local() -> Result<Self, ProviderError> {
        Self::new(
            "http://localhost:11434/api/generate",
            Duration::from_secs(10),
            Duration::from_secs(300),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The model listing URL that sits next to the generate endpoint.
    fn tags_url(&self) -> String {
        match self.endpoint.strip_suffix("/api/generate") {
            Some(base) => format!("{base}/api/tags"),
            None => format!("{}/api/tags", self.endpoint.trim_end_matches('/')),
        }
    }
}

/// Map a request-level reqwest failure onto the provider taxonomy.
fn classify(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else if e.is_body() || e.is_decode() {
        ProviderError::UnreadableBody(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<ByteStream, ProviderError> {
        debug!(provider = %self.name, model = %request.model, endpoint = %self.endpoint, "Sending streaming request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/x-ndjson")
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider streaming error");
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        let body = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::StreamInterrupted(e.to_string())
                }
            })
        });

        Ok(Box::pin(body))
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(self.tags_url())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(classify)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(ProviderError::ApiError { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// `GET /api/tags` response.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
