// src/exec/synthesize.rs

//! Turning an exit code, the last progress object and stderr into the one
//! result an invocation returns.

use crate::exec::stderr::StderrBuffer;
use crate::protocol::{ProgressObject, REASON_UNKNOWN, STATUS_FAILED, STATUS_NODATA};
use crate::types::StderrMode;

/// Lines of stderr kept under [`StderrMode::Minimal`].
const MINIMAL_STDERR_LINES: usize = 2;

/// Build the final result.
///
/// - exit code `0`: the candidate as-is, or `{"status":"nodata"}`.
/// - otherwise: `status` defaults to `"failed"`, `reason` to `"unknown"`,
///   and stderr is appended to `message` according to `mode`. A candidate
///   that is not a JSON object is replaced by a fresh object.
pub fn synthesize_result(
    exit_code: i32,
    candidate: Option<ProgressObject>,
    stderr: &StderrBuffer,
    mode: StderrMode,
) -> ProgressObject {
    if exit_code == 0 {
        return candidate.unwrap_or_else(|| ProgressObject::with_status(STATUS_NODATA));
    }

    let mut result = candidate.unwrap_or_default();
    if result.is_unset("status") {
        result.insert("status", STATUS_FAILED);
    }
    if result.is_unset("reason") {
        result.insert("reason", REASON_UNKNOWN);
    }

    let appended = match mode {
        StderrMode::All => Some(stderr.text()),
        StderrMode::Minimal => Some(stderr.head(MINIMAL_STDERR_LINES)),
        StderrMode::None => None,
    };
    if let Some(text) = appended {
        let message = message_text(&result);
        result.insert("message", format!("{message}\nstderr:\n{text}"));
    }

    result
}

fn message_text(result: &ProgressObject) -> String {
    match result.get("message") {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn obj(v: Value) -> ProgressObject {
        serde_json::from_value(v).unwrap()
    }

    fn stderr(text: &str) -> StderrBuffer {
        let mut buf = StderrBuffer::new();
        buf.append(text.as_bytes());
        buf
    }

    #[test]
    fn success_without_output_is_nodata() {
        let r = synthesize_result(0, None, &stderr("noise\n"), StderrMode::All);
        assert_eq!(r.into_value(), json!({"status": "nodata"}));
    }

    #[test]
    fn success_returns_candidate_untouched() {
        let candidate = obj(json!({"status": "ok", "value": 7}));
        let r = synthesize_result(0, Some(candidate.clone()), &stderr("warn\n"), StderrMode::All);
        assert_eq!(r, candidate);
    }

    #[test]
    fn failure_without_output_under_all() {
        let r = synthesize_result(3, None, &stderr("boom\n"), StderrMode::All);
        assert_eq!(
            r.into_value(),
            json!({"status": "failed", "reason": "unknown", "message": "\nstderr:\nboom"})
        );
    }

    #[test]
    fn failure_keeps_driver_status_reason_and_message() {
        let candidate = obj(json!({"status": "aborted", "reason": "oom", "message": "ran out"}));
        let r = synthesize_result(1, Some(candidate), &stderr("a\nb\nc\n"), StderrMode::Minimal);
        assert_eq!(
            r.into_value(),
            json!({"status": "aborted", "reason": "oom", "message": "ran out\nstderr:\na\nb"})
        );
    }

    #[test]
    fn failure_under_none_appends_nothing() {
        let candidate = obj(json!({"progress": 40}));
        let r = synthesize_result(-15, Some(candidate), &stderr("killed\n"), StderrMode::None);
        assert_eq!(
            r.into_value(),
            json!({"progress": 40, "status": "failed", "reason": "unknown"})
        );
    }

    #[test]
    fn non_object_candidate_survives_success_but_not_failure() {
        let list = ProgressObject::from(json!([1, 2, 3]));
        let ok = synthesize_result(0, Some(list.clone()), &stderr(""), StderrMode::All);
        assert_eq!(ok.into_value(), json!([1, 2, 3]));

        let failed = synthesize_result(1, Some(list), &stderr("oops\n"), StderrMode::All);
        assert_eq!(
            failed.into_value(),
            json!({"status": "failed", "reason": "unknown", "message": "\nstderr:\noops"})
        );
    }

    #[test]
    fn empty_status_counts_as_missing() {
        let candidate = obj(json!({"status": "", "message": 12}));
        let r = synthesize_result(2, Some(candidate), &stderr(""), StderrMode::All);
        assert_eq!(r.status(), Some("failed"));
        assert_eq!(r.message(), Some("12\nstderr:\n"));
    }
}
