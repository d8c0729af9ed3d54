//! One agent, one prompt, one streamed backend call.
//!
//! [`TurnEngine`] is where transport failures stop. Whatever happens on the
//! wire, the caller gets a [`TurnOutcome`] carrying usable, non-empty text.

use std::sync::Arc;

use futures::StreamExt;
use parley_core::agent::Agent;
use parley_core::error::ProviderError;
use parley_core::provider::{GenerateRequest, Provider};
use parley_core::sink::OutputSink;
use parley_providers::decoder::{DecodedTurn, Frame, StreamDecoder};
use tracing::{debug, warn};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The backend streamed a response
    Completed {
        /// Trimmed response text
        text: String,
        /// Fragments received
        fragments: usize,
        /// Stream lines skipped as malformed
        decode_errors: usize,
    },

    /// The call failed and the fallback sentence stands in for the response
    Fallback {
        /// The configured fallback sentence
        text: String,
        /// Why the call failed
        error: ProviderError,
    },
}

impl TurnOutcome {
    /// The text that becomes the next prompt's quote. Never empty.
    pub fn text(&self) -> &str {
        match self {
            Self::Completed { text, .. } | Self::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn error(&self) -> Option<&ProviderError> {
        match self {
            Self::Completed { .. } => None,
            Self::Fallback { error, .. } => Some(error),
        }
    }
}

/// Runs single turns against a provider with a fixed model.
pub struct TurnEngine {
    /// The generation backend
    provider: Arc<dyn Provider>,

    /// Model identifier sent with every request
    model: String,

    /// Substituted when a call fails; the same for every agent and cause
    fallback: String,
}

impl TurnEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            fallback: fallback.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Generate `agent`'s reply to `prompt`, streaming fragments to `sink`.
    ///
    /// Writes a closing newline in every case. On failure the fallback
    /// sentence is written too, so every turn shows something.
    pub async fn run_turn(
        &self,
        agent: &Agent,
        prompt: &str,
        sink: &mut dyn OutputSink,
    ) -> TurnOutcome {
        let mut shown = false;

        match self.stream_turn(agent, prompt, sink, &mut shown).await {
            Ok(turn) => {
                sink.write("\n");
                TurnOutcome::Completed {
                    text: turn.text,
                    fragments: turn.fragments,
                    decode_errors: turn.decode_errors.len(),
                }
            }
            Err(error) => {
                warn!(agent = %agent.id, error = %error, "Turn failed, continuing with fallback response");
                if shown {
                    sink.write("\n");
                }
                sink.write(&self.fallback);
                sink.write("\n");
                TurnOutcome::Fallback {
                    text: self.fallback.clone(),
                    error,
                }
            }
        }
    }

    async fn stream_turn(
        &self,
        agent: &Agent,
        prompt: &str,
        sink: &mut dyn OutputSink,
        shown: &mut bool,
    ) -> Result<DecodedTurn, ProviderError> {
        let request = GenerateRequest::streaming(&self.model, &agent.persona, prompt);
        let mut body = self.provider.generate_stream(request).await?;

        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            let frames = decoder.feed(&chunk);
            emit(agent, &frames, sink, shown);
        }
        let frames = decoder.finish();
        emit(agent, &frames, sink, shown);

        let turn = decoder.into_turn();
        debug!(
            agent = %agent.id,
            fragments = turn.fragments,
            decode_errors = turn.decode_errors.len(),
            "Stream ended"
        );
        if let Some(stats) = turn.stats {
            debug!(
                agent = %agent.id,
                eval_count = ?stats.eval_count,
                prompt_eval_count = ?stats.prompt_eval_count,
                total_duration_ms = ?stats.total_duration_ns.map(|ns| ns / 1_000_000),
                "Generation stats"
            );
        }

        if turn.text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(turn)
    }
}

fn emit(agent: &Agent, frames: &[Frame], sink: &mut dyn OutputSink, shown: &mut bool) {
    for frame in frames {
        match frame {
            Frame::Fragment(text) => {
                sink.write(text);
                *shown = true;
            }
            Frame::Malformed(err) => {
                warn!(agent = %agent.id, line = %err.line, error = %err.reason, "Skipping malformed stream line");
            }
            Frame::BackendError(message) => {
                warn!(agent = %agent.id, error = %message, "Backend reported an error mid-stream");
            }
            Frame::Done(_) => {}
        }
    }
}
