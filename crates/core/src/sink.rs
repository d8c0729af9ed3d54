//! Output sinks: where the live conversation text goes.
//!
//! The sink receives turn headers, fragments as they are decoded, and the
//! newline that closes each turn. It has no buffering contract beyond
//! "visible eventually"; [`StdoutSink`] flushes after every write so
//! fragments appear as they arrive.

use std::io::Write;
use std::sync::{Arc, Mutex};

/// A live text destination.
pub trait OutputSink: Send {
    /// Write `text` as-is.
    fn write(&mut self, text: &str);

    /// Push buffered text out, if the sink buffers.
    fn flush(&mut self) {}
}

/// Writes to the process's standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for StdoutSink {
    fn write(&mut self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::warn!(error = %e, "Failed to write to stdout");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = std::io::stdout().flush() {
            tracing::warn!(error = %e, "Failed to flush stdout");
        }
    }
}

/// Collects everything written into a shared string.
///
/// Cloning yields a handle to the same buffer, so a test can hand one clone
/// to the engine and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, text: &str) {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.push_str(text),
            Err(poisoned) => poisoned.into_inner().push_str(text),
        }
    }
}
