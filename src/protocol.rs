//! Wire model for the checker's IDE protocol.
//!
//! The checker emits newline-delimited JSON on stdout; each line is one
//! independent message discriminated by its `kind` field. Checker positions
//! use 1-based lines and 0-based columns, while the editor side is 0-based
//! for both, so lines shift down by one at this boundary and columns pass
//! through unchanged.
use serde::Deserialize;
use tower_lsp::lsp_types::{Position, Range};

use crate::error::BridgeError;

/// Stage reported by a progress message when a buffer fragment checked out.
pub const STAGE_FRAGMENT_OK: &str = "full-buffer-fragment-ok";

/// One line of checker output, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CheckerMessage {
    /// Protocol version advertisement emitted once at startup.
    ProtocolInfo(serde_json::Value),
    /// Interim message; `level == "progress"` carries checking status.
    Message {
        /// Message level, e.g. "progress" or "info".
        level: String,
        /// Level-specific payload.
        #[serde(default)]
        contents: serde_json::Value,
    },
    /// Terminal answer to a query.
    Response {
        /// Whether the query succeeded.
        status: ResponseStatus,
        /// Failure payload: an array of error entries, when present.
        #[serde(default)]
        response: Option<serde_json::Value>,
    },
}

/// Outcome carried by a `response` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The query completed successfully.
    Success,
    /// The query failed; `response` lists the errors.
    Failure,
}

/// A checker position: a `[line, column]` pair with a 1-based line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CheckerPos(pub u32, pub u32);

impl CheckerPos {
    /// Remap into the editor coordinate system.
    ///
    /// Lines shift to 0-based; columns are already 0-based on both sides.
    pub fn to_lsp(self) -> Position {
        Position::new(self.0.saturating_sub(1), self.1)
    }
}

/// A begin/end pair of checker positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CheckerRange {
    /// Start of the range (inclusive).
    pub beg: CheckerPos,
    /// End of the range.
    pub end: CheckerPos,
}

impl CheckerRange {
    /// Remap both endpoints into an editor range.
    pub fn to_lsp(self) -> Range {
        Range::new(self.beg.to_lsp(), self.end.to_lsp())
    }
}

/// Payload of a progress message.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressContents {
    /// Checking stage, e.g. "full-buffer-fragment-ok".
    #[serde(default)]
    pub stage: Option<String>,
    /// Range the stage applies to.
    #[serde(default)]
    pub ranges: Option<CheckerRange>,
}

/// One entry in a failure response payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable error text.
    pub message: String,
    /// Source ranges the error applies to.
    #[serde(default)]
    pub ranges: Vec<CheckerRange>,
}

/// Parse one line of checker output.
///
/// Malformed JSON and structurally valid JSON with an unrecognized shape are
/// reported as distinct errors so the dispatcher can log them differently;
/// neither aborts the stream.
pub fn parse_line(line: &str) -> Result<CheckerMessage, BridgeError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| BridgeError::MalformedLine(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| BridgeError::UnhandledMessage(e.to_string()))
}
