//! Generation backends for Parley.
//!
//! All backends implement the `parley_core::Provider` trait. The
//! [`decoder`] module turns their raw response bodies back into text.

pub mod decoder;
pub mod ollama;

pub use decoder::{DecodeCarry, DecodedTurn, Frame, GenerationStats, StreamDecoder};
pub use ollama::OllamaProvider;
