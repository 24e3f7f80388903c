//! fstar-bridge — LSP bridge to the F* interactive checker.
//!
//! Each open document gets a dedicated long-lived checker subprocess
//! (`fstar.exe --ide <file>`). Edits are forwarded as full-buffer queries;
//! the checker's newline-delimited JSON output is translated into LSP
//! diagnostics and custom status notifications.
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod query;
pub mod registry;
pub mod server;
pub mod session;
pub mod translate;

// Re-export key types for convenience.
pub use diagnostics::DiagnosticStore;
pub use dispatcher::{Dispatcher, LineBuffer};
pub use error::BridgeError;
pub use protocol::{CheckerMessage, CheckerPos, CheckerRange, ResponseStatus};
pub use query::Query;
pub use registry::SessionRegistry;
pub use server::Bridge;
pub use session::{Session, SessionConfig, SessionEvent, SessionId};
pub use translate::{translate, Effect};
