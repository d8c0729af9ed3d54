//! Conversation state: who speaks next and what was said last.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Roster};

/// Which roster entry holds the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The roster's first agent is speaking
    A,
    /// The roster's second agent is speaking
    B,
}

impl Speaker {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Mutable state of a running dialogue.
///
/// `current` and `other` are always the two roster entries; they swap on
/// every [`advance`](Self::advance). `last_response` holds the most recent
/// completed turn's trimmed text, real or fallback.
#[derive(Debug, Clone)]
pub struct ConversationState {
    current: Agent,
    other: Agent,
    speaker: Speaker,
    last_response: String,
    turns: u64,
}

impl ConversationState {
    /// Attribute `seed` to the roster's first agent without a backend call.
    pub fn seeded(roster: &Roster, seed: impl Into<String>) -> Self {
        Self {
            current: roster.first().clone(),
            other: roster.second().clone(),
            speaker: Speaker::A,
            last_response: seed.into(),
            turns: 0,
        }
    }

    /// Hand the floor to the other agent and return the new speaker.
    pub fn advance(&mut self) -> &Agent {
        std::mem::swap(&mut self.current, &mut self.other);
        self.speaker = self.speaker.other();
        &self.current
    }

    /// Record the text produced by the current speaker's turn.
    pub fn record(&mut self, response: impl Into<String>) {
        self.last_response = response.into();
        self.turns += 1;
    }

    pub fn current(&self) -> &Agent {
        &self.current
    }

    pub fn other(&self) -> &Agent {
        &self.other
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    /// Number of completed backend turns (the seed is not counted).
    pub fn turns(&self) -> u64 {
        self.turns
    }
}
