//! Agent personas and the fixed two-entry roster.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fixed persona taking part in the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Identifier printed as the turn header (e.g. "agent-1")
    pub id: String,

    /// Instructional context prefixed to every prompt sent on this agent's behalf
    pub persona: String,
}

impl Agent {
    pub fn new(id: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            persona: persona.into(),
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// The two agents of a conversation, in speaking order.
///
/// Constructed once at startup and handed to the conversation loop as
/// read-only configuration. The first entry utters the seed, the second
/// makes the first backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    agents: [Agent; 2],
}

impl Roster {
    /// Build a roster, rejecting blank or duplicate ids and blank personas.
    pub fn new(first: Agent, second: Agent) -> Result<Self> {
        for agent in [&first, &second] {
            if agent.id.trim().is_empty() {
                return Err(Error::Config {
                    message: "agent id must not be empty".into(),
                });
            }
            if agent.persona.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("agent '{}' has an empty persona", agent.id),
                });
            }
        }

        if first.id == second.id {
            return Err(Error::Config {
                message: format!("agent ids must be distinct, both are '{}'", first.id),
            });
        }

        Ok(Self {
            agents: [first, second],
        })
    }

    /// Build a roster from a slice that must hold exactly two agents.
    pub fn from_slice(agents: &[Agent]) -> Result<Self> {
        match agents {
            [first, second] => Self::new(first.clone(), second.clone()),
            _ => Err(Error::Config {
                message: format!("exactly two agents are required, found {}", agents.len()),
            }),
        }
    }

    pub fn first(&self) -> &Agent {
        &self.agents[0]
    }

    pub fn second(&self) -> &Agent {
        &self.agents[1]
    }

    pub fn agents(&self) -> &[Agent; 2] {
        &self.agents
    }
}
