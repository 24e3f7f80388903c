//! Per-document diagnostic accumulation.
//!
//! Failure responses arrive incrementally across dispatcher invocations, so
//! diagnostics accumulate per URI between validate passes; the
//! validate-on-change flow clears the slate before each re-check.
use std::collections::HashMap;

use tower_lsp::lsp_types::{Diagnostic, Url};

/// Stores accumulated diagnostics, keyed by document URI.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    store: HashMap<Url, Vec<Diagnostic>>,
}

impl DiagnosticStore {
    /// Create a new empty diagnostic store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append diagnostics for a URI and return the full accumulated list.
    pub fn append(&mut self, uri: &Url, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        let entry = self.store.entry(uri.clone()).or_default();
        entry.extend(diagnostics);
        entry.clone()
    }

    /// Drop all diagnostics for a URI.
    pub fn clear(&mut self, uri: &Url) {
        self.store.remove(uri);
    }
}
