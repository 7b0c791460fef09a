//! Remap - rename JVM symbols across a workspace through chained mappings.
//!
//! This crate provides the CLI binary and its library surface.
//!
//! ## Modules
//!
//! - `cli` - CLI command implementations
//! - `config` - `remap.toml`, environment and flag resolution
//! - `mappings` - tiny v1/v2 mapping file loading

pub mod cli;
pub mod config;
pub mod mappings;

// Re-export core modules so hosts depend on one crate
pub use remap_core::{ambiguity, artifact, coordinator, diagnostic, error, mapping, output, patch, stage, text};
pub use remap_jvm as jvm;

pub use remap_core::error::{OutputErrorCode, RemapError};
pub use remap_core::output::{ErrorInfo, ErrorResponse, RemapResponse, SCHEMA_VERSION};
