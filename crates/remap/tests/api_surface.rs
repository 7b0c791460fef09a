//! Compile-only test to verify public API surface.
//!
//! This file is a compile-time contract for the public API. If it fails to
//! compile, the public API has regressed.

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Core Infrastructure Types
// ============================================================================

// patch module - anchored edits and conflict checks
use remap::patch::{
    Anchor, AnchorResolution, ApplyError, ArtifactPatch, Conflict, ContentHash, Edit, EditKind, OutputEdit, Span,
};

// mapping module - tables, chains, the per-run tree and descriptors
use remap::mapping::{
    package_of, simple_name, to_binary_name, to_source_name, ClassEntry, DeltaTree, Descriptor, DescriptorError,
    Fact, FactConflict, FactKey, FactLayer, FieldEntry, FieldType, MappingChain, MappingError, MappingTable,
    MappingTree, MethodDescriptor, MethodEntry, NamespaceId, Resolution,
};
use remap::mapping::chain::Hop;
use remap::mapping::descriptor::{parse_descriptor, parse_field_descriptor, parse_method_descriptor, remap_descriptor, ReturnType};
use remap::mapping::tree::ClassRecord;

// diagnostics and the ambiguity rule
use remap::ambiguity::{Candidates, Decision};
use remap::diagnostic::{Candidate, Diagnostic, DiagnosticAnchor, DiagnosticKind, MARKER};

// artifacts, stages and the coordinator
use remap::artifact::{ArtifactFilter, ArtifactStore, FsArtifactStore, MemoryArtifactStore, StoreError, DEFAULT_EXCLUDE_DIRS};
use remap::coordinator::{CancelToken, Coordinator, FileMove, RemapPlan, RunOptions, WriteReport, DEFAULT_MAX_ROUNDS};
use remap::stage::{run_pipeline, Adapter, Artifact, ArtifactOutcome, Stage, StageContext, StageError, StageResult};

// error module - error types and codes
use remap::error::{OutputErrorCode, RemapError};

// output module - JSON output types
use remap::output::{
    emit_response, ErrorInfo, ErrorResponse, NamespacesResponse, RemapResponse, Summary, TargetResponse, SCHEMA_VERSION,
};

// text module - offset utilities
use remap::text;

// ============================================================================
// JVM Adapters
// ============================================================================

use remap::jvm::json::{parse_json, string_literal, JsonError, JsonNode, JsonValue};
use remap::jvm::model::{
    AnnotatedElement, AnnotationDecl, AnnotationValue, ClassDecl, FieldDecl, ImportDecl, JavaSource, MethodDecl,
    PackageDecl, Qualifier, RecordComponent, RefContext, ReferenceSite, Symbol,
};
use remap::jvm::mod_json::MOD_JSON;
use remap::jvm::target::{MemberKind, Target, TargetDesc, TargetError, TargetResolution, SPECIAL_METHODS};
use remap::jvm::{
    default_adapters, ClassTweakerAdapter, JavaAdapter, KotlinAdapter, MixinAdapter, MixinConfigAdapter, ModJsonAdapter,
    ReferenceResolver, SourceIndex, SymbolTable,
};

// ============================================================================
// CLI Library Surface
// ============================================================================

use remap::cli::{list_namespaces, load_chain, load_index, resolve_target, run_remap};
use remap::config::{
    CliOverrides, ConfigError, ConfigSource, ConfigValue, MappingSpec, ResolvedConfig, CONFIG_FILE, ENV_EXCLUDE,
    ENV_INCLUDE, ENV_MAX_ROUNDS, ENV_SERIAL,
};
use remap::mappings::{load_table, parse_mappings};
use remap::{ErrorInfo as RootErrorInfo, OutputErrorCode as RootOutputErrorCode, RemapError as RootRemapError};

#[test]
fn api_surface_compiles() {
    // This test passes if the file compiles.
}
