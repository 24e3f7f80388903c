//! Outbound query construction and encoding.
//!
//! Queries are transient: built, stamped with the session's next query-id,
//! serialized to a single newline-terminated JSON line, and forgotten.
use serde_json::json;

/// An outbound request to the checker, before id stamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Query name, e.g. "vfs-add" or "full-buffer".
    pub query: String,
    /// Query arguments.
    pub args: serde_json::Value,
}

impl Query {
    /// Register the full in-memory buffer contents with the checker.
    ///
    /// The null filename signals in-memory content rather than disk content.
    pub fn vfs_add(contents: &str) -> Self {
        Self {
            query: "vfs-add".to_string(),
            args: json!({ "filename": null, "contents": contents }),
        }
    }

    /// Re-check the complete buffer from the top.
    pub fn full_buffer(code: &str) -> Self {
        Self {
            query: "full-buffer".to_string(),
            args: json!({ "kind": "full", "code": code, "line": 0, "column": 0 }),
        }
    }

    /// Serialize with the given query-id as one newline-terminated line.
    pub fn encode(&self, query_id: u64) -> Vec<u8> {
        let mut line = json!({
            "query": self.query,
            "args": self.args,
            "query-id": query_id.to_string(),
        })
        .to_string();
        line.push('\n');
        line.into_bytes()
    }
}
