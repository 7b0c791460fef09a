//! Patch IR: anchored edits and per-artifact patches.
//!
//! Edits are proposed during resolution and applied only in the write phase:
//! - Anchored edits carry a hash of the text they expect to replace
//! - Overlapping edits within one artifact are detected before apply
//! - Apply splices edits from the end of the file toward the start, so
//!   earlier replacements never shift the coordinates of later ones

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::text::byte_offset_to_position;

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Byte offsets into artifact text.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Empty span at `offset`, used for inserts.
    pub fn at(offset: u64) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The text this span covers, if it lies within `text` on char boundaries.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start as usize..self.end as usize)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Location of an edit plus the hash of the text expected there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub span: Span,
    pub expected_hash: ContentHash,
}

/// Outcome of checking an anchor against current content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorResolution {
    Resolved(Span),
    HashMismatch {
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },
    OutOfBounds {
        span: Span,
        file_len: u64,
    },
}

impl Anchor {
    /// Anchor an edit to the exact bytes currently at `span`.
    pub fn span_exact(span: Span, content: &[u8]) -> Self {
        let start = (span.start as usize).min(content.len());
        let end = (span.end as usize).min(content.len());
        Anchor {
            span,
            expected_hash: ContentHash::compute(&content[start..end]),
        }
    }

    /// Check the anchor against `content`.
    pub fn resolve(&self, content: &[u8]) -> AnchorResolution {
        let len = content.len() as u64;
        if self.span.end > len {
            return AnchorResolution::OutOfBounds {
                span: self.span,
                file_len: len,
            };
        }
        let actual = ContentHash::compute(&content[self.span.start as usize..self.span.end as usize]);
        if actual == self.expected_hash {
            AnchorResolution::Resolved(self.span)
        } else {
            AnchorResolution::HashMismatch {
                span: self.span,
                expected: self.expected_hash.clone(),
                actual,
            }
        }
    }
}

/// Type of edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Insert,
    Delete,
    Replace,
}

/// A proposed edit in one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// Emission order within the artifact.
    pub id: u32,
    pub kind: EditKind,
    pub anchor: Anchor,
    /// Replacement or inserted text (empty for deletes).
    pub text: String,
    /// Stage that produced the edit.
    pub origin: String,
}

impl Edit {
    pub fn replace(id: u32, anchor: Anchor, text: impl Into<String>) -> Self {
        Edit {
            id,
            kind: EditKind::Replace,
            anchor,
            text: text.into(),
            origin: String::new(),
        }
    }

    pub fn insert(id: u32, offset: u64, text: impl Into<String>) -> Self {
        Edit {
            id,
            kind: EditKind::Insert,
            anchor: Anchor {
                span: Span::at(offset),
                expected_hash: ContentHash::compute(&[]),
            },
            text: text.into(),
            origin: String::new(),
        }
    }

    pub fn delete(id: u32, anchor: Anchor) -> Self {
        Edit {
            id,
            kind: EditKind::Delete,
            anchor,
            text: String::new(),
            origin: String::new(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn span(&self) -> Span {
        self.anchor.span
    }
}

/// Apply order: rightmost first; at equal starts the longer span goes first so
/// an insert at the start of a replaced span lands before the replacement.
fn apply_order(a: &Edit, b: &Edit) -> Ordering {
    b.span()
        .start
        .cmp(&a.span().start)
        .then_with(|| b.span().end.cmp(&a.span().end))
        .then_with(|| b.id.cmp(&a.id))
}

/// Two edits whose spans overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub kept: Span,
    pub dropped: Span,
    pub dropped_origin: String,
}

/// Errors from applying a patch to artifact text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("{file}: text at {span} changed since resolution (expected {expected}, found {actual})")]
    AnchorHashMismatch {
        file: String,
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },

    #[error("{file}: span {span} out of bounds (length {file_len})")]
    SpanOutOfBounds {
        file: String,
        span: Span,
        file_len: u64,
    },

    #[error("{file}: overlapping edits at {first} and {second}")]
    OverlappingSpans {
        file: String,
        first: Span,
        second: Span,
    },

    #[error("{file}: edit at {span} is not on a character boundary")]
    NotCharBoundary { file: String, span: Span },
}

impl ApplyError {
    pub fn file(&self) -> Option<&str> {
        match self {
            ApplyError::AnchorHashMismatch { file, .. }
            | ApplyError::SpanOutOfBounds { file, .. }
            | ApplyError::OverlappingSpans { file, .. }
            | ApplyError::NotCharBoundary { file, .. } => Some(file),
        }
    }
}

// ============================================================================
// ArtifactPatch
// ============================================================================

/// All edits proposed for one artifact in one round, plus an optional move.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPatch {
    pub path: String,
    pub edits: Vec<Edit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relocate_to: Option<String>,
}

impl ArtifactPatch {
    pub fn new(path: impl Into<String>) -> Self {
        ArtifactPatch {
            path: path.into(),
            edits: Vec::new(),
            relocate_to: None,
        }
    }

    /// True if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.relocate_to.is_none()
    }

    /// Remove edits that overlap an earlier-emitted edit.
    ///
    /// Edits are visited in emission order; the first of any overlapping pair
    /// is kept.
    pub fn drop_conflicts(&mut self) -> Vec<Conflict> {
        let mut kept: Vec<Edit> = Vec::with_capacity(self.edits.len());
        let mut conflicts = Vec::new();
        let mut edits = std::mem::take(&mut self.edits);
        edits.sort_by_key(|e| e.id);
        for edit in edits {
            match kept.iter().find(|k| k.span().overlaps(&edit.span())) {
                Some(existing) => conflicts.push(Conflict {
                    kept: existing.span(),
                    dropped: edit.span(),
                    dropped_origin: edit.origin.clone(),
                }),
                None => kept.push(edit),
            }
        }
        self.edits = kept;
        conflicts
    }

    /// Apply all edits to `content`, returning the new text.
    ///
    /// Nothing is applied if any anchor fails.
    pub fn apply(&self, content: &str) -> Result<String, ApplyError> {
        let bytes = content.as_bytes();
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by(|a, b| apply_order(a, b));

        for pair in ordered.windows(2) {
            if pair[0].span().overlaps(&pair[1].span()) {
                return Err(ApplyError::OverlappingSpans {
                    file: self.path.clone(),
                    first: pair[1].span(),
                    second: pair[0].span(),
                });
            }
        }

        for edit in &ordered {
            match edit.anchor.resolve(bytes) {
                AnchorResolution::Resolved(span) => {
                    if !content.is_char_boundary(span.start as usize)
                        || !content.is_char_boundary(span.end as usize)
                    {
                        return Err(ApplyError::NotCharBoundary {
                            file: self.path.clone(),
                            span,
                        });
                    }
                }
                AnchorResolution::HashMismatch {
                    span,
                    expected,
                    actual,
                } => {
                    return Err(ApplyError::AnchorHashMismatch {
                        file: self.path.clone(),
                        span,
                        expected,
                        actual,
                    })
                }
                AnchorResolution::OutOfBounds { span, file_len } => {
                    return Err(ApplyError::SpanOutOfBounds {
                        file: self.path.clone(),
                        span,
                        file_len,
                    })
                }
            }
        }

        let mut out = content.to_string();
        for edit in ordered {
            let span = edit.span();
            let range = span.start as usize..span.end as usize;
            match edit.kind {
                EditKind::Insert | EditKind::Replace => out.replace_range(range, &edit.text),
                EditKind::Delete => out.replace_range(range, ""),
            }
        }
        Ok(out)
    }

    /// Render edits for output, ordered by span start then id.
    pub fn materialize(&self, content: &str) -> Vec<OutputEdit> {
        let mut sorted: Vec<&Edit> = self.edits.iter().collect();
        sorted.sort_by(|a, b| {
            a.span()
                .start
                .cmp(&b.span().start)
                .then_with(|| a.id.cmp(&b.id))
        });
        sorted
            .into_iter()
            .map(|edit| {
                let span = edit.span();
                let old_text = span.slice(content).unwrap_or_default().to_string();
                let (line, col) = byte_offset_to_position(content, span.start);
                OutputEdit {
                    file: self.path.clone(),
                    span,
                    old_text,
                    new_text: match edit.kind {
                        EditKind::Delete => String::new(),
                        _ => edit.text.clone(),
                    },
                    line,
                    col,
                }
            })
            .collect()
    }
}

// ============================================================================
// Patch Materialization
// ============================================================================

/// A single edit as it appears in output (for JSON serialization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdit {
    /// Workspace-relative file path.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Original text (for verification).
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    /// 1-indexed line number (for display).
    pub line: u32,
    /// 1-indexed column (for display).
    pub col: u32,
}

// ============================================================================
// Tests
// ============================================================================
