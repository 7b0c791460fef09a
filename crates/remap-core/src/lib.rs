//! Core infrastructure for remap.
//!
//! This crate is format-agnostic:
//! - Mapping tables, chains and the per-run mapping tree
//! - Patch IR for anchored, conflict-checked edits
//! - Diagnostics and the shared ambiguity rule
//! - Artifact stores, adapters and stage pipelines
//! - The fixed-point coordinator
//! - Error types and JSON output types for CLI responses

pub mod ambiguity;
pub mod artifact;
pub mod coordinator;
pub mod diagnostic;
pub mod error;
pub mod mapping;
pub mod output;
pub mod patch;
pub mod stage;
pub mod text;
