//! LSP front end: the document lifecycle adapter.
//!
//! Reacts to open/change/close events from the editor, drives the session
//! registry and query encoder, and applies translated checker effects back
//! through the LSP connection.
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, InitializeParams, InitializeResult, InitializedParams, Range,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};

use crate::diagnostics::DiagnosticStore;
use crate::query::Query;
use crate::registry::SessionRegistry;
use crate::session::{SessionConfig, SessionEvent};
use crate::translate::{Effect, DIAGNOSTIC_SOURCE};

/// Default checker executable when the client configures none.
const DEFAULT_CHECKER_EXE: &str = "fstar.exe";

/// Capacity of the session event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Params for the `fstar-bridge/statusOk` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusOkParams {
    /// The checked document.
    pub uri: Url,
    /// Successfully checked ranges, in editor coordinates.
    pub ranges: Vec<Range>,
}

/// Notifies the editor that the given ranges checked successfully.
pub enum StatusOkNotification {}

impl Notification for StatusOkNotification {
    type Params = StatusOkParams;
    const METHOD: &'static str = "fstar-bridge/statusOk";
}

/// Params for the `fstar-bridge/statusClear` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusClearParams {
    /// The document whose prior status should be discarded.
    pub uri: Url,
}

/// Tells the editor to discard prior status for a document.
pub enum StatusClearNotification {}

impl Notification for StatusClearNotification {
    type Params = StatusClearParams;
    const METHOD: &'static str = "fstar-bridge/statusClear";
}

/// The bridge's LSP server.
pub struct Bridge {
    client: Client,
    registry: Arc<Mutex<SessionRegistry>>,
    diagnostics: Arc<Mutex<DiagnosticStore>>,
    checker_exe: Mutex<String>,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl Bridge {
    /// Create the bridge and start its effect-consumer task.
    pub fn new(client: Client) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));
        let diagnostics = Arc::new(Mutex::new(DiagnosticStore::new()));
        tokio::spawn(consume_events(
            events_rx,
            client.clone(),
            registry.clone(),
            diagnostics.clone(),
        ));
        Self {
            client,
            registry,
            diagnostics,
            checker_exe: Mutex::new(DEFAULT_CHECKER_EXE.to_string()),
            events_tx,
        }
    }

    /// Clear stale results and re-check the full buffer.
    ///
    /// Runs on open and on every change; identical re-checks are not
    /// deduplicated.
    async fn validate(&self, uri: &Url, text: &str) {
        self.diagnostics.lock().await.clear(uri);
        self.client
            .publish_diagnostics(uri.clone(), Vec::new(), None)
            .await;
        self.client
            .send_notification::<StatusClearNotification>(StatusClearParams { uri: uri.clone() })
            .await;
        if let Err(e) = self
            .registry
            .lock()
            .await
            .send(uri, &Query::full_buffer(text))
            .await
        {
            tracing::warn!(uri = %uri, error = %e, "failed to send full-buffer query");
        }
    }

    /// Publish a single bridge-level error diagnostic for the document.
    async fn report_bridge_failure(&self, uri: &Url, message: String) {
        let all = self
            .diagnostics
            .lock()
            .await
            .append(uri, vec![bridge_diagnostic(message)]);
        self.client.publish_diagnostics(uri.clone(), all, None).await;
    }
}

/// Build a zero-range error diagnostic for bridge-level failures.
fn bridge_diagnostic(message: String) -> Diagnostic {
    Diagnostic {
        range: Range::default(),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Diagnostic::default()
    }
}

/// Applies session events through the LSP client.
async fn consume_events(
    mut events_rx: mpsc::Receiver<SessionEvent>,
    client: Client,
    registry: Arc<Mutex<SessionRegistry>>,
    diagnostics: Arc<Mutex<DiagnosticStore>>,
) {
    while let Some(event) = events_rx.recv().await {
        match event {
            SessionEvent::Effect {
                uri,
                effect: Effect::Diagnostics(new),
            } => {
                let all = diagnostics.lock().await.append(&uri, new);
                client.publish_diagnostics(uri, all, None).await;
            }
            SessionEvent::Effect {
                uri,
                effect: Effect::StatusOk(ranges),
            } => {
                client
                    .send_notification::<StatusOkNotification>(StatusOkParams { uri, ranges })
                    .await;
            }
            SessionEvent::Exited { uri, id } => {
                // EOF from a closed or replaced session must leave the
                // currently registered session alone.
                if registry.lock().await.close_if_current(&uri, id).await {
                    tracing::warn!(uri = %uri, "checker process exited unexpectedly");
                    let all = diagnostics.lock().await.append(
                        &uri,
                        vec![bridge_diagnostic(
                            "checker process exited unexpectedly".to_string(),
                        )],
                    );
                    client.publish_diagnostics(uri, all, None).await;
                }
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Bridge {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(exe) = params
            .initialization_options
            .as_ref()
            .and_then(|opts| opts.get("fstarExe"))
            .and_then(|v| v.as_str())
        {
            *self.checker_exe.lock().await = exe.to_string();
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "fstar-bridge".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("bridge initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        self.registry.lock().await.close_all().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;

        let path = match uri.to_file_path() {
            Ok(path) => path,
            Err(()) => {
                tracing::warn!(uri = %uri, "ignoring non-file document");
                return;
            }
        };
        let working_dir = path
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let config = SessionConfig::ide(
            self.checker_exe.lock().await.clone(),
            filename,
            working_dir,
        );

        let opened = self
            .registry
            .lock()
            .await
            .open(uri.clone(), &config, self.events_tx.clone())
            .await;
        if let Err(e) = opened {
            tracing::error!(uri = %uri, error = %e, "failed to start checker");
            self.report_bridge_failure(&uri, format!("could not start checker: {}", e))
                .await;
            return;
        }

        if let Err(e) = self
            .registry
            .lock()
            .await
            .send(&uri, &Query::vfs_add(&text))
            .await
        {
            tracing::warn!(uri = %uri, error = %e, "failed to send vfs-add query");
        }

        // Opening counts as the first change.
        self.validate(&uri, &text).await;
    }

    async fn did_change(&self, mut params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the complete buffer.
        let Some(change) = params.content_changes.pop() else {
            return;
        };
        self.validate(&params.text_document.uri, &change.text).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Err(e) = self.registry.lock().await.close(&uri).await {
            tracing::debug!(uri = %uri, error = %e, "close for document without session");
        }
        self.diagnostics.lock().await.clear(&uri);
        self.client
            .publish_diagnostics(uri, Vec::new(), None)
            .await;
    }
}
