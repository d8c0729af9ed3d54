//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley dialogue engine.
//! This crate has **no transport dependencies**. It defines the domain model
//! that the provider, agent, and CLI crates implement against.
//!
//! ## Design Philosophy
//!
//! The backend and the output surface are traits here. Implementations live in
//! their respective crates. This enables:
//! - Swapping the generation backend via configuration
//! - Testing the turn engine and loop with scripted providers and in-memory sinks
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod sink;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, Roster};
pub use conversation::{ConversationState, Speaker};
pub use error::{DecodeError, Error, ProviderError, Result};
pub use provider::{ByteStream, GenerateRequest, Provider};
pub use sink::{MemorySink, OutputSink, StdoutSink};
