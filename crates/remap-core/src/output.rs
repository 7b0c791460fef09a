//! JSON output types for CLI responses.
//!
//! Every response has `status` first and carries `schema_version`. Arrays are
//! emitted in a deterministic order: edits by file then offset, diagnostics by
//! file then kind, so the same input produces identical bytes.

use std::collections::BTreeSet;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::coordinator::{FileMove, RemapPlan, WriteReport};
use crate::diagnostic::Diagnostic;
use crate::error::{OutputErrorCode, RemapError};
use crate::mapping::tree::Fact;
use crate::patch::OutputEdit;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files_changed: u32,
    pub edits_count: u32,
    pub files_moved: u32,
    pub diagnostics_count: u32,
    pub bytes_added: i64,
    pub bytes_removed: i64,
}

impl Summary {
    pub fn from_edits(edits: &[OutputEdit], moves: &[FileMove], diagnostics: &[Diagnostic]) -> Self {
        let files: BTreeSet<&str> = edits.iter().map(|e| e.file.as_str()).collect();
        let mut bytes_added: i64 = 0;
        let mut bytes_removed: i64 = 0;
        for edit in edits {
            bytes_added += edit.new_text.len() as i64;
            bytes_removed += edit.old_text.len() as i64;
        }
        Summary {
            files_changed: files.len() as u32,
            edits_count: edits.len() as u32,
            files_moved: moves.len() as u32,
            diagnostics_count: diagnostics.len() as u32,
            bytes_added: bytes_added - bytes_removed.min(bytes_added),
            bytes_removed: bytes_removed - bytes_added.min(bytes_removed),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for `remap run`.
#[derive(Debug, Clone, Serialize)]
pub struct RemapResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Rounds the fixed-point loop executed.
    pub rounds: u32,
    pub converged: bool,
    pub edits: Vec<OutputEdit>,
    pub moves: Vec<FileMove>,
    pub diagnostics: Vec<Diagnostic>,
    /// Facts synthesized by stages and fed into later rounds.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub synthesized: Vec<Fact>,
    pub summary: Summary,
    /// Present when `--apply` was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_written: Option<Vec<String>>,
}

impl RemapResponse {
    /// A dry-run response.
    pub fn from_plan(plan: &RemapPlan) -> Self {
        let mut edits = plan.output_edits();
        edits.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.span.start.cmp(&b.span.start))
        });
        let moves = plan.moves();
        let mut diagnostics = plan.diagnostics.clone();
        diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.anchor.cmp(&b.anchor))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        let summary = Summary::from_edits(&edits, &moves, &diagnostics);
        RemapResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rounds: plan.rounds,
            converged: plan.converged,
            edits,
            moves,
            diagnostics,
            synthesized: plan.synthesized.clone(),
            summary,
            applied: None,
            files_written: None,
        }
    }

    /// A response after the plan was written.
    pub fn with_apply(plan: &RemapPlan, report: &WriteReport) -> Self {
        let mut response = RemapResponse::from_plan(plan);
        response.applied = Some(true);
        response.files_written = Some(report.files_written.clone());
        // Only the moves that happened; skipped ones come back as diagnostics.
        response.moves = report.moves.clone();
        response.diagnostics.extend(report.diagnostics.iter().cloned());
        response.summary = Summary::from_edits(&response.edits, &response.moves, &response.diagnostics);
        response
    }
}

/// Response for `remap namespaces`.
#[derive(Debug, Clone, Serialize)]
pub struct NamespacesResponse {
    pub status: String,
    pub schema_version: String,
    pub file: String,
    pub namespaces: Vec<String>,
    pub class_count: u32,
}

impl NamespacesResponse {
    pub fn new(file: impl Into<String>, namespaces: Vec<String>, class_count: usize) -> Self {
        NamespacesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: file.into(),
            namespaces,
            class_count: class_count as u32,
        }
    }
}

/// Response for `remap target`.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResponse {
    pub status: String,
    pub schema_version: String,
    pub input: String,
    /// The rewritten target, absent when it could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TargetResponse {
    pub fn resolved(input: impl Into<String>, output: impl Into<String>) -> Self {
        let input = input.into();
        let output = output.into();
        TargetResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            changed: input != output,
            input,
            output: Some(output),
            reason: None,
        }
    }

    pub fn unresolved(input: impl Into<String>, reason: impl Into<String>) -> Self {
        TargetResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            input: input.into(),
            output: None,
            changed: false,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &RemapError) -> Self {
        let details = match err {
            RemapError::InvalidArguments { details, .. } => details.clone(),
            RemapError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            RemapError::ApplyError { file, .. } => file.as_ref().map(|f| serde_json::json!({ "file": f })),
            RemapError::Cancelled { round } => Some(serde_json::json!({ "round": round })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &RemapError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }

    pub fn new(code: u8, message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo {
                code,
                message: message.into(),
                details: None,
            },
        }
    }
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Span;

    fn edit(file: &str, start: u64, old: &str, new: &str) -> OutputEdit {
        OutputEdit {
            file: file.to_string(),
            span: Span::new(start, start + old.len() as u64),
            old_text: old.to_string(),
            new_text: new.to_string(),
            line: 1,
            col: start as u32 + 1,
        }
    }

    #[test]
    fn summary_nets_bytes() {
        let edits = vec![edit("a", 0, "Foo", "Renamed"), edit("b", 3, "xyz", "q")];
        let summary = Summary::from_edits(&edits, &[], &[]);
        assert_eq!(summary.files_changed, 2);
        assert_eq!(summary.edits_count, 2);
        assert_eq!(summary.bytes_added, 2);
        assert_eq!(summary.bytes_removed, 0);
    }

    #[test]
    fn error_response_carries_code_and_details() {
        let err = RemapError::file_not_found("mappings.tiny");
        let response = ErrorResponse::from_error(&err);
        assert_eq!(response.status, "error");
        assert_eq!(response.error.code, 3);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["details"]["path"], "mappings.tiny");
    }

    #[test]
    fn emit_response_is_deterministic() {
        let response = TargetResponse::resolved("La/B;foo()V", "La/C;bar()V");
        let mut first = Vec::new();
        let mut second = Vec::new();
        emit_response(&response, &mut first).unwrap();
        emit_response(&response, &mut second).unwrap();
        assert_eq!(first, second);
        let parsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["changed"], true);
        assert!(parsed.get("reason").is_none());
    }
}
