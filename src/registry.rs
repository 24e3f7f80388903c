//! Session registry mapping open documents to checker sessions.
//!
//! Owns every session for the lifetime of the bridge. Removing a document
//! or dropping the whole registry must terminate the corresponding
//! subprocesses rather than leave them orphaned.
use std::collections::HashMap;

use tokio::sync::mpsc;
use tower_lsp::lsp_types::Url;

use crate::error::BridgeError;
use crate::query::Query;
use crate::session::{Session, SessionConfig, SessionEvent, SessionId};

/// Manages checker sessions, one per open document.
pub struct SessionRegistry {
    sessions: HashMap<Url, Session>,
    /// Counter for generating unique session IDs.
    next_id: u64,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Spawn a checker for `uri` and register the session.
    ///
    /// Re-opening a URI that already has a live session replaces it: the
    /// old subprocess is terminated before the new one is spawned.
    pub async fn open(
        &mut self,
        uri: Url,
        config: &SessionConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<(), BridgeError> {
        if let Some(previous) = self.sessions.remove(&uri) {
            tracing::info!(uri = %uri, "replacing existing session");
            previous.shutdown().await;
        }
        let id = SessionId::new(self.next_id);
        self.next_id += 1;
        let session = Session::spawn(uri.clone(), id, config, events)?;
        self.sessions.insert(uri, session);
        Ok(())
    }

    /// Send a query to the session for `uri`.
    ///
    /// A missing session is a silent no-op: a document may be validated
    /// after its session was already closed by an async race.
    pub async fn send(&mut self, uri: &Url, query: &Query) -> Result<(), BridgeError> {
        match self.sessions.get_mut(uri) {
            Some(session) => session.send_query(query).await,
            None => {
                tracing::debug!(uri = %uri, "no session for document, dropping query");
                Ok(())
            }
        }
    }

    /// Look up the session for `uri`.
    pub fn get(&self, uri: &Url) -> Option<&Session> {
        self.sessions.get(uri)
    }

    /// Check if a session is registered for `uri`.
    pub fn has_session(&self, uri: &Url) -> bool {
        self.sessions.contains_key(uri)
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Close the session for `uri`, terminating its subprocess.
    pub async fn close(&mut self, uri: &Url) -> Result<(), BridgeError> {
        match self.sessions.remove(uri) {
            Some(session) => {
                session.shutdown().await;
                Ok(())
            }
            None => Err(BridgeError::NoSession(uri.to_string())),
        }
    }

    /// Close the session for `uri` only if it is still the one named by `id`.
    ///
    /// Exit events are keyed by session identity: a stale exit from a
    /// replaced or already-closed session must not tear down the session
    /// currently registered for the URI. Returns whether a session was
    /// closed.
    pub async fn close_if_current(&mut self, uri: &Url, id: SessionId) -> bool {
        if self.sessions.get(uri).map(Session::id) != Some(id) {
            tracing::debug!(uri = %uri, ?id, "ignoring exit of superseded session");
            return false;
        }
        if let Some(session) = self.sessions.remove(uri) {
            session.shutdown().await;
        }
        true
    }

    /// Close every session.
    pub async fn close_all(&mut self) {
        for (_, session) in self.sessions.drain() {
            session.shutdown().await;
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("session_count", &self.sessions.len())
            .finish()
    }
}
