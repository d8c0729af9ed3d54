//! The conversation engine for Parley.
//!
//! Two agents take turns answering each other:
//!
//! 1. **Seed** the first agent's line from configuration (no backend call)
//! 2. **Advance** the floor to the other agent
//! 3. **Prompt** the backend with that agent's persona and the last response
//! 4. **Stream** the reply to the output sink as fragments arrive
//! 5. **Fall back** to a fixed sentence if the call fails, then keep going
//!
//! The loop runs until its cancellation token fires.

pub mod loop_runner;
pub mod prompt;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

pub use loop_runner::{ConversationLoop, LoopExit, LoopSettings};
pub use prompt::PromptTemplate;
pub use turn::{TurnEngine, TurnOutcome};
