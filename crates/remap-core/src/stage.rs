//! Artifact adapters and their stage pipelines.
//!
//! An [`Adapter`] claims artifacts by path and rewrites them through an
//! ordered list of [`Stage`]s. Stages never touch the artifact directly: they
//! propose edits, diagnostics and synthesized facts through a
//! [`StageContext`], which the coordinator collects once every adapter has
//! run.
//!
//! ## Failure isolation
//!
//! [`run_pipeline`] runs stages in order. A stage that returns an error or
//! panics loses its remaining work, but later stages still run and edits
//! already proposed are kept. The artifact then gets one file-level
//! diagnostic listing every failed stage.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, warn};

use crate::ambiguity::Decision;
use crate::diagnostic::{Candidate, Diagnostic, DiagnosticAnchor, DiagnosticKind};
use crate::mapping::descriptor::DescriptorError;
use crate::mapping::tree::{DeltaTree, Fact, MappingTree};
use crate::patch::{Anchor, ArtifactPatch, Edit, EditKind, Span};
use crate::text::{line_indent, line_start};

/// One artifact's text, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub text: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Artifact {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Errors a stage may return to abandon its remaining work.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("no source model for {path}")]
    MissingModel { path: String },

    #[error("span {span} is outside the artifact")]
    BadSpan { span: Span },
}

impl StageError {
    pub fn failed(message: impl Into<String>) -> Self {
        StageError::Failed(message.into())
    }
}

pub type StageResult = Result<(), StageError>;

/// A per-format front end.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this adapter handles the artifact at `path`.
    fn matches(&self, path: &str) -> bool;

    /// Line-comment prefix for inserted diagnostics; `None` reports them only.
    fn comment_prefix(&self) -> Option<&'static str> {
        None
    }

    /// Where file-level diagnostics are inserted.
    fn file_comment_offset(&self, _text: &str) -> u64 {
        0
    }

    /// Run this adapter's stages over the artifact in `ctx`.
    fn remap(&self, ctx: &mut StageContext<'_>);
}

/// A named step of an adapter's pipeline with per-artifact state `S`.
pub struct Stage<A: ?Sized, S> {
    pub name: &'static str,
    pub run: fn(&A, &mut S, &mut StageContext<'_>) -> StageResult,
}

/// Run `stages` in order, isolating failures per stage.
pub fn run_pipeline<A: ?Sized, S>(
    adapter: &A,
    state: &mut S,
    stages: &[Stage<A, S>],
    ctx: &mut StageContext<'_>,
) {
    for stage in stages {
        ctx.stage = stage.name;
        let result = catch_unwind(AssertUnwindSafe(|| (stage.run)(adapter, state, ctx)));
        let message = match result {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err.to_string(),
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string()),
        };
        warn!(file = %ctx.artifact.path, stage = stage.name, %message, "stage failed");
        ctx.record_failure(stage.name, message);
    }
    ctx.stage = "";
}

#[derive(Debug, Clone)]
struct Failure {
    stage: String,
    message: String,
}

/// Everything one artifact produced in one round.
#[derive(Debug, Clone, Default)]
pub struct ArtifactOutcome {
    pub patch: ArtifactPatch,
    pub diagnostics: Vec<Diagnostic>,
}

/// The handle a stage uses to read the artifact and propose changes.
pub struct StageContext<'a> {
    artifact: &'a Artifact,
    tree: &'a MappingTree,
    delta: &'a DeltaTree,
    adapter: &'static str,
    comment_prefix: Option<&'static str>,
    file_comment_offset: u64,
    stage: &'static str,
    patch: ArtifactPatch,
    next_id: u32,
    diagnostics: Vec<Diagnostic>,
    inserted_comments: HashSet<(u64, String)>,
    failures: Vec<Failure>,
    failure_comment: Option<(&'static str, u64)>,
}

impl<'a> StageContext<'a> {
    pub fn new(artifact: &'a Artifact, tree: &'a MappingTree, delta: &'a DeltaTree) -> Self {
        StageContext {
            artifact,
            tree,
            delta,
            adapter: "",
            comment_prefix: None,
            file_comment_offset: 0,
            stage: "",
            patch: ArtifactPatch::new(artifact.path.clone()),
            next_id: 0,
            diagnostics: Vec::new(),
            inserted_comments: HashSet::new(),
            failures: Vec::new(),
            failure_comment: None,
        }
    }

    /// Run `adapter` against this artifact.
    pub fn run_adapter(&mut self, adapter: &dyn Adapter) {
        self.adapter = adapter.name();
        self.comment_prefix = adapter.comment_prefix();
        self.file_comment_offset = adapter.file_comment_offset(&self.artifact.text);
        debug!(file = %self.artifact.path, adapter = adapter.name(), "running adapter");
        adapter.remap(self);
        self.adapter = "";
    }

    pub fn path(&self) -> &str {
        &self.artifact.path
    }

    pub fn text(&self) -> &'a str {
        &self.artifact.text
    }

    pub fn artifact(&self) -> &'a Artifact {
        self.artifact
    }

    pub fn tree(&self) -> &'a MappingTree {
        self.tree
    }

    pub fn slice(&self, span: Span) -> Option<&'a str> {
        span.slice(&self.artifact.text)
    }

    fn origin(&self) -> String {
        format!("{}::{}", self.adapter, self.stage)
    }

    fn push_edit(&mut self, edit: Edit) {
        let edit = edit.with_origin(self.origin());
        self.patch.edits.push(edit);
        self.next_id += 1;
    }

    /// Propose replacing `span` with `text`. No-op when the text is already there.
    pub fn replace(&mut self, span: Span, text: impl Into<String>) -> Result<(), StageError> {
        let text = text.into();
        let duplicate = self
            .patch
            .edits
            .iter()
            .any(|e| e.span() == span && e.text == text && e.kind != EditKind::Insert);
        match self.slice(span) {
            Some(current) if current == text || duplicate => Ok(()),
            Some(_) => {
                let anchor = Anchor::span_exact(span, self.artifact.text.as_bytes());
                self.push_edit(Edit::replace(self.next_id, anchor, text));
                Ok(())
            }
            None => Err(StageError::BadSpan { span }),
        }
    }

    /// Propose inserting `text` at `offset`.
    pub fn insert(&mut self, offset: u64, text: impl Into<String>) {
        self.push_edit(Edit::insert(self.next_id, offset, text));
    }

    /// Request a move of this artifact to `new_path` after all edits apply.
    pub fn relocate(&mut self, new_path: impl Into<String>) {
        let new_path = new_path.into();
        if new_path != self.artifact.path {
            self.patch.relocate_to = Some(new_path);
        }
    }

    /// Record a synthesized fact for the next round, unless it already holds.
    pub fn rerun(&mut self, fact: Fact) {
        if self.tree.holds(&fact) {
            return;
        }
        debug!(file = %self.artifact.path, fact = ?fact.key, new = %fact.new_name, "synthesized fact");
        self.delta.push(fact);
    }

    /// Report a diagnostic and insert it as a comment if the adapter can.
    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        let diagnostic = diagnostic.with_file(self.artifact.path.clone());
        if let Some(prefix) = self.comment_prefix {
            let (offset, indent) = match diagnostic.anchor {
                DiagnosticAnchor::File => (self.file_comment_offset, ""),
                DiagnosticAnchor::Declaration(at) => {
                    let text = self.text();
                    (line_start(text, at), line_indent(text, at))
                }
            };
            self.insert_comment(offset, diagnostic.render(prefix, indent));
        }
        self.diagnostics.push(diagnostic);
    }

    /// Report a diagnostic without touching the artifact.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics
            .push(diagnostic.with_file(self.artifact.path.clone()));
    }

    fn insert_comment(&mut self, offset: u64, rendered: String) {
        let text = self.text();
        let already_present = text
            .get(offset as usize..)
            .is_some_and(|rest| rest.starts_with(&rendered));
        if already_present || !self.inserted_comments.insert((offset, rendered.clone())) {
            return;
        }
        self.insert(offset, rendered);
    }

    pub fn report(&mut self, kind: DiagnosticKind, anchor: DiagnosticAnchor, message: impl Into<String>) {
        self.diagnostic(Diagnostic::new(kind, anchor, message));
    }

    pub fn ambiguous(&mut self, anchor: DiagnosticAnchor, message: impl Into<String>, candidates: Vec<Candidate>) {
        self.diagnostic(Diagnostic::new(DiagnosticKind::Ambiguous, anchor, message).with_candidates(candidates));
    }

    pub fn unsupported(&mut self, anchor: DiagnosticAnchor, message: impl Into<String>) {
        self.report(DiagnosticKind::Unsupported, anchor, message);
    }

    /// Apply an ambiguity [`Decision`] to the text at `span`.
    ///
    /// Returns the new name when a rename was proposed.
    pub fn apply_decision(
        &mut self,
        decision: Decision,
        span: Span,
        anchor: DiagnosticAnchor,
        what: &str,
    ) -> Result<Option<String>, StageError> {
        match decision {
            Decision::Keep => Ok(None),
            Decision::Rename(name) => {
                self.replace(span, name.clone())?;
                Ok(Some(name))
            }
            Decision::Ambiguous(candidates) => {
                self.ambiguous(anchor, format!("ambiguous rename of {}", what), candidates);
                Ok(None)
            }
        }
    }

    fn record_failure(&mut self, stage: &str, message: String) {
        if self.failure_comment.is_none() {
            if let Some(prefix) = self.comment_prefix {
                self.failure_comment = Some((prefix, self.file_comment_offset));
            }
        }
        self.failures.push(Failure {
            stage: format!("{}::{}", self.adapter, stage),
            message,
        });
    }

    /// Collect this artifact's results, adding the partial-failure diagnostic.
    pub fn finish(mut self) -> ArtifactOutcome {
        if !self.failures.is_empty() {
            let detail: Vec<String> = self
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.stage, f.message))
                .collect();
            let diagnostic = Diagnostic::new(
                DiagnosticKind::StageFailure,
                DiagnosticAnchor::File,
                format!("failed to fully remap file ({})", detail.join("; ")),
            )
            .with_file(self.artifact.path.clone());
            if let Some((prefix, offset)) = self.failure_comment {
                let rendered = diagnostic.render(prefix, "");
                self.stage = "finish";
                self.insert_comment(offset, rendered);
            }
            self.diagnostics.push(diagnostic);
        }
        ArtifactOutcome {
            patch: self.patch,
            diagnostics: self.diagnostics,
        }
    }
}
