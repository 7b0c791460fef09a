//! Diagnostics: ambiguities, unsupported constructs and failures that skip a
//! rewrite instead of aborting the run.
//!
//! Each diagnostic is reported in the run output and, when the artifact's
//! adapter has a comment syntax, inserted into the artifact as a comment
//! starting with [`MARKER`].

use serde::{Deserialize, Serialize};

/// Fixed token that starts every inserted diagnostic comment.
pub const MARKER: &str = "TODO(remap):";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// More than one distinct new name is plausible.
    Ambiguous,
    /// A construct the rewriter does not handle (wildcards, regex targets, ...).
    Unsupported,
    /// Input that does not follow its format (bad header, wrong schema).
    Invalid,
    /// A stage failed; later stages still ran.
    StageFailure,
    /// Two edits in one artifact overlapped; the later one was dropped.
    Conflict,
    /// The fixed-point loop hit its round limit.
    NonConvergence,
}

/// Where in the artifact a diagnostic belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "at", content = "offset", rename_all = "snake_case")]
pub enum DiagnosticAnchor {
    /// Top of the artifact (after any header the adapter declares).
    File,
    /// Start of the declaration containing this byte offset.
    Declaration(u64),
}

/// One option considered when a rename was ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Artifact path; `None` for run-level diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub anchor: DiagnosticAnchor,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, anchor: DiagnosticAnchor, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            file: None,
            anchor,
            message: message.into(),
            candidates: Vec::new(),
        }
    }

    /// A run-level diagnostic not tied to any artifact.
    pub fn run_level(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic::new(kind, DiagnosticAnchor::File, message)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Comment lines for this diagnostic, without comment prefix or indent.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{} {}", MARKER, self.message)];
        for c in &self.candidates {
            lines.push(format!("  {} -> {}", c.label, c.new_name));
        }
        lines
    }

    /// The comment block to insert: each line prefixed and indented, each
    /// ending in a newline.
    pub fn render(&self, comment_prefix: &str, indent: &str) -> String {
        self.lines()
            .iter()
            .map(|line| format!("{}{} {}\n", indent, comment_prefix, line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_indents_every_line() {
        let diag = Diagnostic::new(
            DiagnosticKind::Ambiguous,
            DiagnosticAnchor::Declaration(10),
            "ambiguous rename of run()V",
        )
        .with_candidates(vec![
            Candidate {
                label: "a/Base#run()V".to_string(),
                new_name: "execute".to_string(),
            },
            Candidate {
                label: "a/Iface#run()V".to_string(),
                new_name: "perform".to_string(),
            },
        ]);
        assert_eq!(
            diag.render("//", "    "),
            "    // TODO(remap): ambiguous rename of run()V\n\
             \x20   //   a/Base#run()V -> execute\n\
             \x20   //   a/Iface#run()V -> perform\n"
        );
    }

    #[test]
    fn serializes_kind_in_snake_case() {
        let diag = Diagnostic::run_level(DiagnosticKind::NonConvergence, "gave up after 5 rounds");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"non_convergence\""));
        assert!(!json.contains("candidates"));
        assert!(!json.contains("\"file\""));
    }
}
