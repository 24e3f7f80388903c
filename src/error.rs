//! Bridge error types.
/// Errors from bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Checker process failed to start.
    #[error("checker failed to start: {0}")]
    SpawnFailed(String),

    /// The session's subprocess is gone or shutting down.
    #[error("session is closed")]
    SessionClosed,

    /// No session registered for the document.
    #[error("no session for document: {0}")]
    NoSession(String),

    /// A line of checker output was not valid JSON.
    #[error("malformed checker output: {0}")]
    MalformedLine(String),

    /// A line parsed as JSON but matched no known message shape.
    #[error("unhandled checker message: {0}")]
    UnhandledMessage(String),
}
