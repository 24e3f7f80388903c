//! Response dispatch for checker output.
//!
//! Raw stdout chunks do not align with message boundaries, so each session
//! keeps a persistent line buffer: complete newline-terminated lines are
//! dispatched as they arrive and the trailing partial line is retained for
//! the next chunk.
use crate::error::BridgeError;
use crate::protocol::{parse_line, CheckerMessage};

/// Accumulates raw bytes and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and drain every complete line it finishes.
    ///
    /// Returned lines have their terminator (and any `\r`) stripped. Lines
    /// that are not valid UTF-8 are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            match String::from_utf8(raw) {
                Ok(mut line) => {
                    while line.ends_with('\n') || line.ends_with('\r') {
                        line.pop();
                    }
                    lines.push(line);
                }
                Err(_) => tracing::warn!("discarding non-UTF-8 line from checker"),
            }
        }
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Splits chunks into lines and parses each one independently.
///
/// Malformed or unrecognized lines are logged and discarded; one bad line
/// never aborts processing of subsequent lines.
#[derive(Debug, Default)]
pub struct Dispatcher {
    lines: LineBuffer,
}

impl Dispatcher {
    /// Create a dispatcher with an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch one raw chunk of checker output.
    ///
    /// Returns one message per complete, non-empty, recognized line.
    pub fn dispatch_chunk(&mut self, chunk: &[u8]) -> Vec<CheckerMessage> {
        let mut routed = Vec::new();
        for line in self.lines.push(chunk) {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(message) => routed.push(message),
                Err(BridgeError::UnhandledMessage(e)) => {
                    tracing::debug!(error = %e, "unhandled checker message");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding undecodable checker line");
                }
            }
        }
        routed
    }
}
