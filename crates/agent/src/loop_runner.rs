//! The conversation loop implementation.

use std::sync::Arc;
use std::time::Duration;

use parley_config::AppConfig;
use parley_core::agent::Roster;
use parley_core::conversation::ConversationState;
use parley_core::error::Error;
use parley_core::provider::Provider;
use parley_core::sink::OutputSink;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::prompt::PromptTemplate;
use crate::turn::{TurnEngine, TurnOutcome};

/// Loop parameters fixed at startup.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Opening line attributed to the roster's first agent
    pub seed: String,

    /// Builds each turn's prompt from the previous response
    pub prompt: PromptTemplate,

    /// Pause after every turn
    pub turn_delay: Duration,

    /// Written once when the loop is cancelled
    pub shutdown_notice: String,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            seed: config.seed.clone(),
            prompt: PromptTemplate::new(config.prompt_template.clone()),
            turn_delay: config.turn_delay(),
            shutdown_notice: config.shutdown_notice.clone(),
        }
    }
}

/// Why [`ConversationLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopExit {
    /// Backend turns completed before cancellation
    pub turns: u64,
}

/// Drives the two-agent exchange until cancelled.
///
/// Strictly sequential: a turn, including its whole stream, finishes before
/// the delay starts, and the delay finishes before the next turn.
pub struct ConversationLoop {
    /// The two agents, fixed for the loop's lifetime
    roster: Roster,

    /// Runs each turn; never fails
    engine: TurnEngine,

    settings: LoopSettings,
}

impl ConversationLoop {
    pub fn new(roster: Roster, engine: TurnEngine, settings: LoopSettings) -> Self {
        Self {
            roster,
            engine,
            settings,
        }
    }

    /// Build a loop from validated configuration.
    ///
    /// This is where static configuration defects surface; they are fatal.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, Error> {
        let roster = config.roster()?;
        let engine = TurnEngine::new(provider, &config.model, &config.fallback_response);
        Ok(Self::new(roster, engine, LoopSettings::from_config(config)))
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Print the seed as the first agent's line and return the opening state.
    pub fn start(&self, sink: &mut dyn OutputSink) -> ConversationState {
        let state = ConversationState::seeded(&self.roster, self.settings.seed.clone());
        sink.write(&format!("{}: {}\n", state.current().id, state.last_response()));
        state
    }

    /// Hand the floor over and run one turn for the new speaker.
    pub async fn take_turn(
        &self,
        state: &mut ConversationState,
        sink: &mut dyn OutputSink,
    ) -> TurnOutcome {
        let prompt = self.settings.prompt.render(state.last_response());
        let agent = state.advance().clone();

        sink.write(&format!("{}: ", agent.id));
        let outcome = self.engine.run_turn(&agent, &prompt, sink).await;

        state.record(outcome.text());
        debug!(
            agent = %agent.id,
            turn = state.turns(),
            fallback = outcome.is_fallback(),
            "Turn complete"
        );
        outcome
    }

    /// Run until `cancel` fires.
    ///
    /// Cancellation is observed before each turn, during the in-flight call,
    /// and during the inter-turn delay. An abandoned call produces no further
    /// output; the shutdown notice is written exactly once.
    pub async fn run(&self, cancel: &CancellationToken, sink: &mut dyn OutputSink) -> LoopExit {
        info!(
            first = %self.roster.first().id,
            second = %self.roster.second().id,
            model = %self.engine.model(),
            "Conversation started"
        );
        let mut state = self.start(sink);

        while !cancel.is_cancelled() {
            let finished = tokio::select! {
                biased;
                () = cancel.cancelled() => false,
                _ = self.take_turn(&mut state, sink) => true,
            };
            if !finished {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.settings.turn_delay) => {}
            }
        }

        sink.write(&format!("\n{}\n", self.settings.shutdown_notice));
        sink.flush();
        info!(turns = state.turns(), "Conversation stopped");

        LoopExit {
            turns: state.turns(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Script, ScriptedProvider};
    use parley_core::agent::Agent;
    use parley_core::error::ProviderError;
    use parley_core::sink::MemorySink;

    const FALLBACK: &str = "I ran into an error, but let's keep going. What's next?";
    const NOTICE: &str = "Conversation stopped by user.";

    fn settings() -> LoopSettings {
        LoopSettings {
            seed: "Hello! What AI trend excites you?".into(),
            prompt: PromptTemplate::new("Other said: \"{last}\". Reply and ask one question."),
            turn_delay: Duration::from_secs(1),
            shutdown_notice: NOTICE.into(),
        }
    }

    fn conversation(provider: Arc<ScriptedProvider>) -> ConversationLoop {
        let roster = Roster::new(
            Agent::new("agent-1", "You are curious."),
            Agent::new("agent-2", "You are an expert."),
        )
        .unwrap();
        ConversationLoop::new(
            roster,
            TurnEngine::new(provider, "qwen3:4b", FALLBACK),
            settings(),
        )
    }

    fn reply(text: &str) -> String {
        format!("{{\"response\":\"{text}\"}}\n")
    }

    #[tokio::test]
    async fn seed_printed_without_backend_call() {
        let provider = Arc::new(ScriptedProvider::chunks(&["{\"response\":\"x\"}\n"]));
        let conversation = conversation(provider.clone());
        let sink = MemorySink::new();

        let state = conversation.start(&mut sink.clone());
        assert_eq!(sink.contents(), "agent-1: Hello! What AI trend excites you?\n");
        assert_eq!(state.current().id, "agent-1");
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn speakers_alternate_and_prompts_chain() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Script::Chunks(vec![reply("first")]),
            Script::Chunks(vec![reply("second")]),
            Script::Chunks(vec![reply("third")]),
            Script::Chunks(vec![reply("fourth")]),
        ]));
        let conversation = conversation(provider.clone());
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        let mut state = conversation.start(&mut writer);
        let mut speakers = Vec::new();
        for _ in 0..4 {
            conversation.take_turn(&mut state, &mut writer).await;
            speakers.push(state.current().id.clone());
        }

        assert_eq!(speakers, ["agent-2", "agent-1", "agent-2", "agent-1"]);
        assert_eq!(state.turns(), 4);
        assert_eq!(state.last_response(), "fourth");

        let requests = provider.requests();
        assert!(requests[0].prompt.starts_with("You are an expert.\n\n"));
        assert!(requests[0].prompt.contains("\"Hello! What AI trend excites you?\""));
        assert!(requests[1].prompt.starts_with("You are curious.\n\n"));
        assert!(requests[1].prompt.contains("\"first\""));
        assert!(requests[3].prompt.contains("\"third\""));

        assert_eq!(
            sink.contents(),
            "agent-1: Hello! What AI trend excites you?\n\
             agent-2: first\n\
             agent-1: second\n\
             agent-2: third\n\
             agent-1: fourth\n"
        );
    }

    #[tokio::test]
    async fn failed_turn_still_advances() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Script::Fail(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
            Script::Chunks(vec![reply("recovered")]),
        ]));
        let conversation = conversation(provider.clone());
        let sink = MemorySink::new();
        let mut writer = sink.clone();

        let mut state = conversation.start(&mut writer);
        let outcome = conversation.take_turn(&mut state, &mut writer).await;
        assert!(outcome.is_fallback());
        assert_eq!(state.turns(), 1);
        assert_eq!(state.current().id, "agent-2");
        assert_eq!(state.last_response(), FALLBACK);

        let outcome = conversation.take_turn(&mut state, &mut writer).await;
        assert_eq!(outcome.text(), "recovered");
        assert_eq!(state.turns(), 2);
        assert_eq!(state.current().id, "agent-1");

        let requests = provider.requests();
        assert!(requests[1].prompt.contains(FALLBACK));
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel_between_turns() {
        let cancel = CancellationToken::new();
        let provider = Arc::new(
            ScriptedProvider::chunks(&["{\"response\":\"ok\"}\n"]).cancel_after(3, cancel.clone()),
        );
        let conversation = conversation(provider.clone());
        let sink = MemorySink::new();

        let exit = conversation.run(&cancel, &mut sink.clone()).await;

        // The third call cancels while its own stream is being raced, so it
        // may or may not complete; no fourth call is ever made.
        assert_eq!(provider.requests().len(), 3);
        assert!(exit.turns == 2 || exit.turns == 3);

        let shown = sink.contents();
        assert_eq!(shown.matches(NOTICE).count(), 1);
        assert!(shown.ends_with(&format!("\n{NOTICE}\n")));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_stalled_stream_abandons_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Script::Chunks(vec![reply("one")]),
            Script::Stall(vec![reply("partial")]),
        ]));
        let conversation = conversation(provider.clone());
        let cancel = CancellationToken::new();
        let sink = MemorySink::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                cancel.cancel();
            })
        };

        let exit = conversation.run(&cancel, &mut sink.clone()).await;
        canceller.await.unwrap();

        assert_eq!(exit.turns, 1);
        assert_eq!(provider.requests().len(), 2);
        assert_eq!(
            sink.contents(),
            format!(
                "agent-1: Hello! What AI trend excites you?\n\
                 agent-2: one\n\
                 agent-1: partial\n{NOTICE}\n"
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_delay_skips_next_turn() {
        let provider = Arc::new(ScriptedProvider::chunks(&["{\"response\":\"ok\"}\n"]));
        let conversation = conversation(provider.clone());
        let cancel = CancellationToken::new();
        let sink = MemorySink::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                // Lands inside the first one-second delay
                tokio::time::sleep(Duration::from_millis(500)).await;
                cancel.cancel();
            })
        };

        let exit = conversation.run(&cancel, &mut sink.clone()).await;
        canceller.await.unwrap();

        assert_eq!(exit.turns, 1);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_calls() {
        let provider = Arc::new(ScriptedProvider::chunks(&["{\"response\":\"ok\"}\n"]));
        let conversation = conversation(provider.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sink = MemorySink::new();

        let exit = conversation.run(&cancel, &mut sink.clone()).await;
        assert_eq!(exit.turns, 0);
        assert!(provider.requests().is_empty());
        assert_eq!(sink.contents().matches(NOTICE).count(), 1);
    }

    #[test]
    fn from_config_rejects_bad_roster() {
        let mut config = AppConfig::default();
        config.agents.truncate(1);
        let provider = Arc::new(ScriptedProvider::chunks(&["{}\n"]));
        assert!(matches!(
            ConversationLoop::from_config(&config, provider),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn from_config_uses_configured_settings() {
        let config = AppConfig::default();
        let provider = Arc::new(ScriptedProvider::chunks(&["{}\n"]));
        let conversation = ConversationLoop::from_config(&config, provider).unwrap();
        assert_eq!(conversation.roster().first().id, "agent-1");
        assert_eq!(conversation.settings.turn_delay, Duration::from_millis(1000));
        assert_eq!(conversation.engine.fallback(), config.fallback_response);
    }
}
