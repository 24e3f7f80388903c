//! Translation of routed checker messages into editor-facing effects.
//!
//! Each message yields at most one effect: error diagnostics from a failure
//! response, a status-ok range from a progress message, or nothing.
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use crate::protocol::{
    CheckerMessage, ErrorEntry, ProgressContents, ResponseStatus, STAGE_FRAGMENT_OK,
};

/// Source tag attached to published diagnostics.
pub(crate) const DIAGNOSTIC_SOURCE: &str = "fstar";

/// An editor-facing effect produced from one checker message.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Error diagnostics to accumulate for the document.
    Diagnostics(Vec<Diagnostic>),
    /// Fragment ranges that checked successfully.
    StatusOk(Vec<Range>),
}

/// Convert one routed message into at most one effect.
pub fn translate(message: &CheckerMessage) -> Option<Effect> {
    match message {
        CheckerMessage::ProtocolInfo(info) => {
            tracing::debug!(?info, "checker protocol-info");
            None
        }
        CheckerMessage::Message { level, contents } if level == "progress" => progress(contents),
        CheckerMessage::Message { level, .. } => {
            tracing::debug!(%level, "ignoring non-progress checker message");
            None
        }
        CheckerMessage::Response {
            status: ResponseStatus::Failure,
            response: Some(payload),
        } => failure(payload),
        // A failure without a payload carries nothing to report.
        CheckerMessage::Response {
            status: ResponseStatus::Failure,
            response: None,
        } => None,
        // Success acknowledgement is currently unused.
        CheckerMessage::Response {
            status: ResponseStatus::Success,
            ..
        } => None,
    }
}

/// Handle a progress message. Only the fragment-ok stage produces an effect;
/// other stages are reserved.
fn progress(contents: &serde_json::Value) -> Option<Effect> {
    let contents: ProgressContents = match serde_json::from_value(contents.clone()) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!(error = %e, "undecodable progress contents");
            return None;
        }
    };
    match (contents.stage.as_deref(), contents.ranges) {
        (Some(STAGE_FRAGMENT_OK), Some(ranges)) => Some(Effect::StatusOk(vec![ranges.to_lsp()])),
        _ => None,
    }
}

/// Handle a failure payload: one error diagnostic per entry, using only the
/// entry's first range.
fn failure(payload: &serde_json::Value) -> Option<Effect> {
    let entries: Vec<ErrorEntry> = match serde_json::from_value(payload.clone()) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable failure payload");
            return None;
        }
    };
    let diagnostics: Vec<Diagnostic> = entries
        .iter()
        .map(|entry| {
            let range = entry
                .ranges
                .first()
                .map(|range| range.to_lsp())
                .unwrap_or_default();
            Diagnostic {
                range,
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: entry.message.clone(),
                ..Diagnostic::default()
            }
        })
        .collect();
    if diagnostics.is_empty() {
        None
    } else {
        Some(Effect::Diagnostics(diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_line;
    use tower_lsp::lsp_types::Position;

    fn message(line: &str) -> CheckerMessage {
        parse_line(line).unwrap()
    }

    #[test]
    fn fragment_ok_remaps_to_status() {
        let msg = message(
            r#"{"kind":"message","level":"progress","contents":{"stage":"full-buffer-fragment-ok","ranges":{"beg":[3,0],"end":[5,2]}}}"#,
        );
        match translate(&msg) {
            Some(Effect::StatusOk(ranges)) => {
                assert_eq!(ranges.len(), 1);
                assert_eq!(ranges[0].start, Position::new(2, 0));
                assert_eq!(ranges[0].end, Position::new(4, 2));
            }
            other => panic!("expected status-ok, got: {:?}", other),
        }
    }

    #[test]
    fn other_progress_stage_is_ignored() {
        let msg = message(
            r#"{"kind":"message","level":"progress","contents":{"stage":"loading-dependency"}}"#,
        );
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn fragment_ok_without_ranges_is_ignored() {
        let msg = message(
            r#"{"kind":"message","level":"progress","contents":{"stage":"full-buffer-fragment-ok"}}"#,
        );
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn non_progress_level_is_ignored() {
        let msg = message(r#"{"kind":"message","level":"info","contents":{"stage":"x"}}"#);
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn failure_yields_one_diagnostic_per_entry() {
        let msg = message(
            r#"{"kind":"response","status":"failure","response":[
                {"message":"first","ranges":[{"beg":[1,4],"end":[1,5]}]},
                {"message":"second","ranges":[{"beg":[2,0],"end":[2,3]},{"beg":[9,9],"end":[9,9]}]},
                {"message":"third","ranges":[{"beg":[4,1],"end":[4,2]}]}
            ]}"#,
        );
        match translate(&msg) {
            Some(Effect::Diagnostics(diags)) => {
                assert_eq!(diags.len(), 3);
                assert_eq!(diags[0].message, "first");
                assert_eq!(diags[0].range.start, Position::new(0, 4));
                assert_eq!(diags[0].range.end, Position::new(0, 5));
                // Only the first range of each entry is used.
                assert_eq!(diags[1].range.start, Position::new(1, 0));
                assert_eq!(diags[1].range.end, Position::new(1, 3));
                assert_eq!(diags[2].message, "third");
            }
            other => panic!("expected diagnostics, got: {:?}", other),
        }
    }

    #[test]
    fn failure_diagnostics_are_error_severity() {
        let msg = message(
            r#"{"kind":"response","status":"failure","response":[{"message":"boom","ranges":[{"beg":[1,0],"end":[1,1]}]}]}"#,
        );
        match translate(&msg) {
            Some(Effect::Diagnostics(diags)) => {
                assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
                assert_eq!(diags[0].source.as_deref(), Some(DIAGNOSTIC_SOURCE));
            }
            other => panic!("expected diagnostics, got: {:?}", other),
        }
    }

    #[test]
    fn failure_entry_without_ranges_uses_zero_range() {
        let msg = message(r#"{"kind":"response","status":"failure","response":[{"message":"boom"}]}"#);
        match translate(&msg) {
            Some(Effect::Diagnostics(diags)) => {
                assert_eq!(diags[0].range, Range::default());
            }
            other => panic!("expected diagnostics, got: {:?}", other),
        }
    }

    #[test]
    fn failure_without_payload_is_noop() {
        let msg = message(r#"{"kind":"response","status":"failure"}"#);
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn failure_with_empty_payload_is_noop() {
        let msg = message(r#"{"kind":"response","status":"failure","response":[]}"#);
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn success_is_noop() {
        let msg = message(r#"{"kind":"response","status":"success","response":[]}"#);
        assert_eq!(translate(&msg), None);
    }

    #[test]
    fn protocol_info_is_noop() {
        let msg = message(r#"{"kind":"protocol-info","version":2}"#);
        assert_eq!(translate(&msg), None);
    }
}
