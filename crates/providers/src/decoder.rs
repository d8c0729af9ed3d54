//! Newline-delimited JSON stream decoding.
//!
//! Ollama's `/api/generate` streams one JSON object per line:
//!
//! ```text
//! {"model":"qwen3:4b","response":"Hel","done":false}
//! {"model":"qwen3:4b","response":"lo","done":false}
//! {"model":"qwen3:4b","response":"","done":true,"eval_count":2,...}
//! ```
//!
//! Network chunks do not respect line or character boundaries, so
//! [`decode_chunk`] threads a [`DecodeCarry`] from one chunk to the next:
//! the bytes of a UTF-8 sequence cut in half, and the text of a line that has
//! not seen its newline yet. [`StreamDecoder`] wraps that pure function and
//! accumulates a turn's text.

use parley_core::error::DecodeError;
use serde_json::Value;

/// State held over between chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeCarry {
    /// Leading bytes of an incomplete UTF-8 sequence (at most 3)
    pending_bytes: Vec<u8>,

    /// Text after the last newline seen so far
    partial_line: String,
}

impl DecodeCarry {
    pub fn is_empty(&self) -> bool {
        self.pending_bytes.is_empty() && self.partial_line.is_empty()
    }
}

/// End-of-generation statistics from the final frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub eval_count: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub total_duration_ns: Option<u64>,
}

/// Something decoded out of the stream, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A piece of generated text
    Fragment(String),

    /// A line that was not a usable JSON object
    Malformed(DecodeError),

    /// The backend put an `error` field on a line
    BackendError(String),

    /// The backend marked the generation complete
    Done(GenerationStats),
}

/// Decode one chunk against the carry left by the previous one.
///
/// Returns every frame completed by this chunk, in order, and the carry to
/// pass alongside the next chunk.
pub fn decode_chunk(mut carry: DecodeCarry, chunk: &[u8]) -> (Vec<Frame>, DecodeCarry) {
    let text = decode_utf8(&mut carry.pending_bytes, chunk);
    carry.partial_line.push_str(&text);

    let mut frames = Vec::new();
    if let Some(last_newline) = carry.partial_line.rfind('\n') {
        let tail = carry.partial_line.split_off(last_newline + 1);
        for line in carry.partial_line.split('\n') {
            parse_line(line, &mut frames);
        }
        carry.partial_line = tail;
    }

    (frames, carry)
}

/// Flush the carry once the transport reports end of body.
///
/// Stray bytes of an unfinished character decode lossily; a trailing line
/// without its newline is still parsed.
pub fn finish(carry: DecodeCarry) -> Vec<Frame> {
    let DecodeCarry {
        pending_bytes,
        mut partial_line,
    } = carry;

    if !pending_bytes.is_empty() {
        partial_line.push_str(&String::from_utf8_lossy(&pending_bytes));
    }

    let mut frames = Vec::new();
    parse_line(&partial_line, &mut frames);
    frames
}

/// Append the complete characters of `pending ++ chunk` to the returned
/// string; an incomplete sequence at the very end goes back into `pending`.
/// Invalid sequences elsewhere become U+FFFD.
fn decode_utf8(pending: &mut Vec<u8>, chunk: &[u8]) -> String {
    let mut bytes = std::mem::take(pending);
    bytes.extend_from_slice(chunk);

    let mut text = String::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match std::str::from_utf8(&bytes[pos..]) {
            Ok(valid) => {
                text.push_str(valid);
                pos = bytes.len();
            }
            Err(e) => {
                let valid_end = pos + e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&bytes[pos..valid_end]));
                match e.error_len() {
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        pos = valid_end + len;
                    }
                    None => {
                        pending.extend_from_slice(&bytes[valid_end..]);
                        break;
                    }
                }
            }
        }
    }
    text
}

/// Only the object shape and `response` matter. Side fields with an
/// unexpected type are dropped on their own, never the fragment with them.
fn parse_line(line: &str, frames: &mut Vec<Frame>) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            frames.push(malformed(line, e.to_string()));
            return;
        }
    };

    let Some(object) = value.as_object() else {
        frames.push(malformed(line, "expected a JSON object".into()));
        return;
    };

    if let Some(error) = object.get("error").and_then(Value::as_str) {
        frames.push(Frame::BackendError(error.to_string()));
    }

    if let Some(fragment) = object
        .get("response")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
    {
        frames.push(Frame::Fragment(fragment.to_string()));
    }

    if object.get("done").and_then(Value::as_bool) == Some(true) {
        let count = |field: &str| object.get(field).and_then(Value::as_u64);
        frames.push(Frame::Done(GenerationStats {
            eval_count: count("eval_count"),
            prompt_eval_count: count("prompt_eval_count"),
            total_duration_ns: count("total_duration"),
        }));
    }
}

fn malformed(line: &str, reason: String) -> Frame {
    Frame::Malformed(DecodeError {
        line: line.to_string(),
        reason,
    })
}

/// Everything a finished stream produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTurn {
    /// Concatenated fragments, trimmed
    pub text: String,

    /// Number of fragments received
    pub fragments: usize,

    /// Lines skipped because they did not parse
    pub decode_errors: Vec<DecodeError>,

    /// Errors the backend reported inside the stream
    pub backend_errors: Vec<String>,

    /// Statistics from the `done` frame, if one arrived
    pub stats: Option<GenerationStats>,
}

/// Stateful decoder for one turn's response body.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry: DecodeCarry,
    turn: DecodedTurn,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and fold its frames into the turn.
    ///
    /// The frames are returned as well so the caller can show fragments and
    /// report errors as they happen.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let (frames, carry) = decode_chunk(std::mem::take(&mut self.carry), chunk);
        self.carry = carry;
        self.absorb(&frames);
        frames
    }

    /// Flush the carry at end of body. Further `feed` calls start fresh.
    pub fn finish(&mut self) -> Vec<Frame> {
        let frames = finish(std::mem::take(&mut self.carry));
        self.absorb(&frames);
        frames
    }

    /// Text accumulated so far, untrimmed.
    pub fn text(&self) -> &str {
        &self.turn.text
    }

    pub fn decode_errors(&self) -> &[DecodeError] {
        &self.turn.decode_errors
    }

    /// Consume the decoder, trimming the accumulated text.
    pub fn into_turn(self) -> DecodedTurn {
        let mut turn = self.turn;
        turn.text = turn.text.trim().to_string();
        turn
    }

    fn absorb(&mut self, frames: &[Frame]) {
        for frame in frames {
            match frame {
                Frame::Fragment(text) => {
                    self.turn.text.push_str(text);
                    self.turn.fragments += 1;
                }
                Frame::Malformed(err) => self.turn.decode_errors.push(err.clone()),
                Frame::BackendError(msg) => self.turn.backend_errors.push(msg.clone()),
                Frame::Done(stats) => self.turn.stats = Some(*stats),
            }
        }
    }
}
