//! A per-document checker session.
//!
//! Each open document owns one long-lived checker subprocess. A writer task
//! forwards encoded queries to its stdin in call order; a reader task splits
//! its stdout into messages and forwards the translated effects to the
//! bridge's event channel.
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tower_lsp::lsp_types::Url;

use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::query::Query;
use crate::translate::{translate, Effect};

/// How to launch the checker for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Checker executable.
    pub command: String,
    /// Command-line arguments, normally `["--ide", <filename>]`.
    pub args: Vec<String>,
    /// Working directory, normally the document's containing directory.
    pub working_dir: PathBuf,
}

impl SessionConfig {
    /// Standard IDE-mode invocation of the checker against `filename`.
    pub fn ide(
        command: impl Into<String>,
        filename: impl Into<String>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            command: command.into(),
            args: vec!["--ide".to_string(), filename.into()],
            working_dir,
        }
    }
}

/// Identity of one spawned session.
///
/// Successive sessions for the same document get distinct ids, so events
/// from a replaced or closed session can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// An event produced by a session's reader task.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A translated editor-facing effect for the document.
    Effect {
        /// The document the effect applies to.
        uri: Url,
        /// The effect itself.
        effect: Effect,
    },
    /// The checker's stdout reached EOF (process exited or crashed).
    Exited {
        /// The document whose checker went away.
        uri: Url,
        /// Which of the document's sessions went away.
        id: SessionId,
    },
}

/// A live checker subprocess bound to one document.
///
/// The session is the exclusive owner of the subprocess: shutting the
/// session down terminates it.
pub struct Session {
    uri: Url,
    id: SessionId,
    child: Child,
    writer_tx: Option<mpsc::Sender<Vec<u8>>>,
    next_query_id: u64,
}

impl Session {
    /// Spawn the checker and start its writer and reader tasks.
    pub fn spawn(
        uri: Url,
        id: SessionId,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Self, BridgeError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::SpawnFailed(format!("{}: {}", config.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::SpawnFailed("could not capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::SpawnFailed("could not capture stdout".into()))?;

        // Writer task: forwards encoded queries to the checker's stdin.
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(line) = writer_rx.recv().await {
                if stdin.write_all(&line).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        // Reader task: raw chunks from stdout, dispatched and translated.
        let reader_uri = uri.clone();
        tokio::spawn(async move {
            let mut stdout = stdout;
            let mut dispatcher = Dispatcher::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = match stdout.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                for message in dispatcher.dispatch_chunk(&chunk[..n]) {
                    if let Some(effect) = translate(&message) {
                        let event = SessionEvent::Effect {
                            uri: reader_uri.clone(),
                            effect,
                        };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
            let _ = events
                .send(SessionEvent::Exited {
                    uri: reader_uri,
                    id,
                })
                .await;
        });

        Ok(Self {
            uri,
            id,
            child,
            writer_tx: Some(writer_tx),
            next_query_id: 0,
        })
    }

    /// This session's identity.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Number of query-ids assigned so far.
    pub fn queries_sent(&self) -> u64 {
        self.next_query_id
    }

    /// Stamp the next query-id onto `query` and hand it to the writer task.
    ///
    /// All writes for one session go through a single channel into a single
    /// stdin loop, so queries reach the checker strictly in call order.
    pub async fn send_query(&mut self, query: &Query) -> Result<(), BridgeError> {
        let writer_tx = self.writer_tx.as_ref().ok_or(BridgeError::SessionClosed)?;
        self.next_query_id += 1;
        let line = query.encode(self.next_query_id);
        writer_tx
            .send(line)
            .await
            .map_err(|_| BridgeError::SessionClosed)
    }

    /// Terminate the owned checker subprocess.
    pub async fn shutdown(mut self) {
        self.writer_tx = None;
        if let Err(e) = self.child.kill().await {
            tracing::warn!(uri = %self.uri, error = %e, "failed to kill checker process");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("uri", &self.uri.as_str())
            .field("id", &self.id)
            .field("next_query_id", &self.next_query_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_equality() {
        let a = SessionId::new(1);
        let b = SessionId::new(1);
        let c = SessionId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn config_ide_invocation_shape() {
        let config = SessionConfig::ide("fstar.exe", "a.fst", PathBuf::from("/tmp"));
        assert_eq!(config.command, "fstar.exe");
        assert_eq!(config.args, vec!["--ide".to_string(), "a.fst".to_string()]);
        assert_eq!(config.working_dir, PathBuf::from("/tmp"));
    }

    #[tokio::test]
    async fn spawn_nonexistent_command_fails() {
        let config = SessionConfig::ide(
            "definitely-not-a-real-checker-xyz",
            "a.fst",
            std::env::temp_dir(),
        );
        let (events_tx, _events_rx) = mpsc::channel(8);
        let uri = Url::parse("file:///a.fst").unwrap();
        let result = Session::spawn(uri, SessionId::new(1), &config, events_tx);
        match result {
            Err(BridgeError::SpawnFailed(msg)) => {
                assert!(msg.contains("definitely-not-a-real-checker-xyz"));
            }
            other => panic!("expected SpawnFailed, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn config_debug_format() {
        let config = SessionConfig::ide("fstar.exe", "a.fst", PathBuf::from("."));
        let debug = format!("{:?}", config);
        assert!(debug.contains("fstar.exe"));
    }
}
