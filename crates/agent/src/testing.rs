//! Shared test helpers for turn and loop tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parley_core::error::ProviderError;
use parley_core::provider::{ByteStream, GenerateRequest, Provider};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What one scripted call does.
#[derive(Clone)]
pub enum Script {
    /// Stream these chunks, then end the body
    Chunks(Vec<String>),
    /// Fail before any body is available
    Fail(ProviderError),
    /// Stream these chunks, then break off with the error
    Interrupted(Vec<String>, ProviderError),
    /// Stream these chunks, then never finish
    Stall(Vec<String>),
}

/// A mock provider that plays back scripted calls in order.
///
/// Once the script runs out, the last entry repeats. Every request is
/// recorded for inspection.
pub struct ScriptedProvider {
    scripts: Vec<Script>,
    requests: Mutex<Vec<GenerateRequest>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            requests: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    /// Every call streams `chunks`.
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::new(vec![Script::Chunks(owned(chunks))])
    }

    /// Every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Script::Fail(error)])
    }

    /// Every call streams `chunks`, then breaks off with `error`.
    pub fn interrupted(chunks: &[&str], error: ProviderError) -> Self {
        Self::new(vec![Script::Interrupted(owned(chunks), error)])
    }

    /// Cancel `token` once `calls` requests have been made.
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn owned(chunks: &[&str]) -> Vec<String> {
    chunks.iter().map(|c| c.to_string()).collect()
}

fn body(chunks: Vec<String>) -> impl futures::Stream<Item = Result<Bytes, ProviderError>> + Send {
    futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<ByteStream, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        if let Some((after, token)) = &self.cancel_after {
            if call >= *after {
                token.cancel();
            }
        }

        let script = self
            .scripts
            .get(call - 1)
            .or(self.scripts.last())
            .cloned()
            .expect("ScriptedProvider needs at least one script");

        match script {
            Script::Chunks(chunks) => Ok(Box::pin(body(chunks))),
            Script::Fail(error) => Err(error),
            Script::Interrupted(chunks, error) => {
                Ok(Box::pin(body(chunks).chain(futures::stream::iter([Err(error)]))))
            }
            Script::Stall(chunks) => Ok(Box::pin(body(chunks).chain(futures::stream::pending()))),
        }
    }
}
