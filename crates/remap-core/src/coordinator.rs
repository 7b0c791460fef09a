//! Run coordination: the fixed-point round loop and the write phase.
//!
//! A run reads every artifact some adapter claims, then repeats rounds:
//!
//! 1. Build a [`MappingTree`] over the chain and all fact layers so far
//! 2. Run every matching adapter on every artifact (in parallel by default)
//! 3. Collect synthesized facts; an empty delta means the run converged
//!
//! Each round starts from the original artifact text and replaces the
//! previous round's edits. Nothing is written until [`Coordinator::write`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactStore, StoreError};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::RemapError;
use crate::mapping::chain::MappingChain;
use crate::mapping::tree::{DeltaTree, Fact, FactConflict, FactKey, MappingTree};
use crate::patch::{ArtifactPatch, OutputEdit};
use crate::stage::{Adapter, Artifact, ArtifactOutcome, StageContext};

/// Default limit on fixed-point rounds.
pub const DEFAULT_MAX_ROUNDS: u32 = 5;

// ============================================================================
// Options
// ============================================================================

/// Shared flag that aborts a run between artifacts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub max_rounds: u32,
    /// Process artifacts of a round on the rayon pool.
    pub parallel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_rounds: DEFAULT_MAX_ROUNDS,
            parallel: true,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// A file move requested by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMove {
    pub from: String,
    pub to: String,
}

/// Resolved but unwritten result of a run.
#[derive(Debug, Clone)]
pub struct RemapPlan {
    /// Rounds executed.
    pub rounds: u32,
    /// Whether the last round synthesized no new facts.
    pub converged: bool,
    /// Non-empty patches from the last round, sorted by path.
    pub patches: Vec<ArtifactPatch>,
    /// Diagnostics from the last round plus run-level ones.
    pub diagnostics: Vec<Diagnostic>,
    /// Facts synthesized across all rounds, oldest first.
    pub synthesized: Vec<Fact>,
    originals: BTreeMap<String, String>,
}

impl RemapPlan {
    pub fn original(&self, path: &str) -> Option<&str> {
        self.originals.get(path).map(String::as_str)
    }

    /// Every edit with line/column and old text, sorted by file then offset.
    pub fn output_edits(&self) -> Vec<OutputEdit> {
        self.patches
            .iter()
            .flat_map(|patch| {
                let original = self.original(&patch.path).unwrap_or_default();
                patch.materialize(original)
            })
            .collect()
    }

    pub fn moves(&self) -> Vec<FileMove> {
        self.patches
            .iter()
            .filter_map(|p| {
                p.relocate_to.as_ref().map(|to| FileMove {
                    from: p.path.clone(),
                    to: to.clone(),
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.iter().all(ArtifactPatch::is_empty)
    }
}

/// What [`Coordinator::write`] changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub files_written: Vec<String>,
    pub moves: Vec<FileMove>,
    /// Moves that were skipped and why.
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Coordinator
// ============================================================================

pub struct Coordinator {
    adapters: Vec<Arc<dyn Adapter>>,
    options: RunOptions,
    cancel: CancelToken,
}

impl Coordinator {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Coordinator {
            adapters,
            options: RunOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn adapters_for(&self, path: &str) -> Vec<&dyn Adapter> {
        self.adapters
            .iter()
            .filter(|a| a.matches(path))
            .map(|a| a.as_ref())
            .collect()
    }

    /// Read every artifact some adapter claims. Unreadable artifacts are
    /// skipped with a run-level diagnostic.
    fn load(&self, store: &dyn ArtifactStore) -> Result<(Vec<Artifact>, Vec<Diagnostic>), RemapError> {
        let mut artifacts = Vec::new();
        let mut diagnostics = Vec::new();
        for path in store.list()? {
            if self.adapters_for(&path).is_empty() {
                continue;
            }
            match store.read(&path) {
                Ok(text) => artifacts.push(Artifact::new(path, text)),
                Err(StoreError::Io { path, source }) => {
                    warn!(%path, error = %source, "skipping unreadable artifact");
                    diagnostics.push(
                        Diagnostic::run_level(DiagnosticKind::Invalid, format!("unreadable artifact: {}", source))
                            .with_file(path),
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(count = artifacts.len(), "loaded artifacts");
        Ok((artifacts, diagnostics))
    }

    /// Resolve all artifacts to a fixed point without writing anything.
    pub fn resolve(&self, store: &dyn ArtifactStore, chain: Arc<MappingChain>) -> Result<RemapPlan, RemapError> {
        let (artifacts, load_diagnostics) = self.load(store)?;
        self.resolve_artifacts(artifacts, load_diagnostics, chain)
    }

    fn resolve_artifacts(
        &self,
        artifacts: Vec<Artifact>,
        mut run_diagnostics: Vec<Diagnostic>,
        chain: Arc<MappingChain>,
    ) -> Result<RemapPlan, RemapError> {
        let max_rounds = self.options.max_rounds.max(1);
        let mut tree = MappingTree::new(chain);
        let mut synthesized = Vec::new();
        let mut round = 0;

        let (outcomes, conflicts, converged) = loop {
            round += 1;
            let delta = DeltaTree::new();
            let outcomes = self.run_round(round, &artifacts, &tree, &delta)?;
            let (layer, conflicts) = delta.finish();
            if layer.is_empty() {
                break (outcomes, conflicts, true);
            }
            if round >= max_rounds {
                warn!(rounds = round, pending = layer.len(), "round limit reached before convergence");
                run_diagnostics.push(Diagnostic::run_level(
                    DiagnosticKind::NonConvergence,
                    format!(
                        "stopped after {} rounds with {} facts still pending; results are from the last round",
                        round,
                        layer.len()
                    ),
                ));
                break (outcomes, conflicts, false);
            }
            info!(round, facts = layer.len(), "synthesized facts, rerunning");
            synthesized.extend(
                layer
                    .iter()
                    .map(|(key, value)| Fact {
                        key: key.clone(),
                        new_name: value.to_string(),
                    }),
            );
            tree = tree.layered(layer);
        };

        run_diagnostics.extend(conflicts.iter().map(conflict_diagnostic));

        let originals = artifacts.into_iter().map(|a| (a.path, a.text)).collect();
        let mut patches = Vec::new();
        let mut diagnostics = Vec::new();
        for outcome in outcomes {
            diagnostics.extend(outcome.diagnostics);
            if !outcome.patch.is_empty() {
                patches.push(outcome.patch);
            }
        }
        patches.sort_by(|a, b| a.path.cmp(&b.path));
        diagnostics.extend(run_diagnostics);

        info!(rounds = round, converged, patches = patches.len(), diagnostics = diagnostics.len(), "resolution finished");
        Ok(RemapPlan {
            rounds: round,
            converged,
            patches,
            diagnostics,
            synthesized,
            originals,
        })
    }

    #[tracing::instrument(skip_all, fields(round = round, artifacts = artifacts.len()))]
    fn run_round(
        &self,
        round: u32,
        artifacts: &[Artifact],
        tree: &MappingTree,
        delta: &DeltaTree,
    ) -> Result<Vec<ArtifactOutcome>, RemapError> {
        let work = |artifact: &Artifact| -> Option<ArtifactOutcome> {
            if self.cancel.is_cancelled() {
                return None;
            }
            Some(self.resolve_artifact(artifact, tree, delta))
        };
        let outcomes: Vec<Option<ArtifactOutcome>> = if self.options.parallel {
            artifacts.par_iter().map(work).collect()
        } else {
            artifacts.iter().map(work).collect()
        };
        if self.cancel.is_cancelled() {
            return Err(RemapError::Cancelled { round });
        }
        Ok(outcomes.into_iter().flatten().collect())
    }

    fn resolve_artifact(&self, artifact: &Artifact, tree: &MappingTree, delta: &DeltaTree) -> ArtifactOutcome {
        let mut ctx = StageContext::new(artifact, tree, delta);
        for adapter in self.adapters_for(&artifact.path) {
            ctx.run_adapter(adapter);
        }
        let mut outcome = ctx.finish();
        for conflict in outcome.patch.drop_conflicts() {
            debug!(file = %artifact.path, kept = %conflict.kept, dropped = %conflict.dropped, "dropped overlapping edit");
            outcome.diagnostics.push(
                Diagnostic::run_level(
                    DiagnosticKind::Conflict,
                    format!(
                        "edit at {} from {} overlaps edit at {} and was dropped",
                        conflict.dropped, conflict.dropped_origin, conflict.kept
                    ),
                )
                .with_file(artifact.path.clone()),
            );
        }
        outcome
    }

    /// Apply a plan.
    ///
    /// Every patch and every move is checked before anything is written.
    /// Moves onto an occupied path, or several moves onto one path, are
    /// dropped with a diagnostic in the report; the text edits still land.
    /// Remaining moves run in dependency order, and cycles go through a
    /// temporary name.
    pub fn write(&self, store: &mut dyn ArtifactStore, plan: &RemapPlan) -> Result<WriteReport, RemapError> {
        let mut pending = Vec::new();
        for patch in &plan.patches {
            let current = store.read(&patch.path)?;
            let updated = patch.apply(&current)?;
            if updated != current {
                pending.push((patch.path.clone(), updated));
            }
        }
        let mut report = WriteReport::default();
        let moves = checked_moves(store, plan.moves(), &mut report.diagnostics);

        for (path, text) in pending {
            store.write(&path, &text)?;
            report.files_written.push(path);
        }
        for moved in ordered_moves(store, moves)? {
            info!(from = %moved.from, to = %moved.to, "relocated artifact");
            report.moves.push(moved);
        }
        Ok(report)
    }
}

/// Drop moves that would clobber a file, repeating until the set is stable
/// since dropping one move can keep its source in place.
fn checked_moves(store: &dyn ArtifactStore, moves: Vec<FileMove>, diagnostics: &mut Vec<Diagnostic>) -> Vec<FileMove> {
    let mut moves: Vec<FileMove> = moves.into_iter().filter(|m| m.from != m.to).collect();
    loop {
        let sources: BTreeSet<&str> = moves.iter().map(|m| m.from.as_str()).collect();
        let mut targets: BTreeMap<&str, usize> = BTreeMap::new();
        for moved in &moves {
            *targets.entry(moved.to.as_str()).or_default() += 1;
        }
        let rejected: Vec<(usize, String)> = moves
            .iter()
            .enumerate()
            .filter_map(|(idx, moved)| {
                let reason = if targets.get(moved.to.as_str()).copied().unwrap_or(0) > 1 {
                    format!("several artifacts move to {}", moved.to)
                } else if !sources.contains(moved.to.as_str()) && store.exists(&moved.to) {
                    format!("{} already exists", moved.to)
                } else {
                    return None;
                };
                Some((idx, reason))
            })
            .collect();
        if rejected.is_empty() {
            return moves;
        }
        for (idx, reason) in rejected.into_iter().rev() {
            let moved = moves.remove(idx);
            warn!(from = %moved.from, to = %moved.to, %reason, "skipping move");
            diagnostics.push(
                Diagnostic::run_level(
                    DiagnosticKind::Conflict,
                    format!("not moved to {}: {}", moved.to, reason),
                )
                .with_file(moved.from),
            );
        }
    }
}

/// Perform checked moves so no move lands on a path still waiting to move.
fn ordered_moves(store: &mut dyn ArtifactStore, moves: Vec<FileMove>) -> Result<Vec<FileMove>, RemapError> {
    // (requested move, path the file currently sits at)
    let mut pending: Vec<(FileMove, String)> = moves.into_iter().map(|m| (m.clone(), m.from)).collect();
    let mut done = Vec::new();
    while !pending.is_empty() {
        let free = pending
            .iter()
            .position(|(moved, _)| !pending.iter().any(|(_, at)| *at == moved.to));
        match free {
            Some(idx) => {
                let (moved, at) = pending.remove(idx);
                store.relocate(&at, &moved.to)?;
                done.push(moved);
            }
            None => {
                // Every remaining move waits on another: park one file.
                let at = pending[0].1.clone();
                let mut parked = format!("{}.remap-tmp", at);
                let mut n = 1;
                while store.exists(&parked) {
                    n += 1;
                    parked = format!("{}.remap-tmp{}", at, n);
                }
                debug!(from = %at, to = %parked, "parking artifact to break a move cycle");
                store.relocate(&at, &parked)?;
                pending[0].1 = parked;
            }
        }
    }
    Ok(done)
}

fn conflict_diagnostic(conflict: &FactConflict) -> Diagnostic {
    let what = match &conflict.key {
        FactKey::Class { name } => name.clone(),
        FactKey::Field { owner, name } => format!("{}.{}", owner, name),
        FactKey::Method { owner, name, desc } => format!("{}.{}{}", owner, name, desc),
    };
    Diagnostic::run_level(
        DiagnosticKind::Ambiguous,
        format!(
            "conflicting synthesized names for {}: {}",
            what,
            conflict.values.join(", ")
        ),
    )
}
