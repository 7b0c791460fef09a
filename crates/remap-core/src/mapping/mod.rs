//! Mapping model: tables, chains, descriptors and the per-run mapping tree.
//!
//! - [`table`]: one parsed mapping file (namespaces, class/field/method entries)
//! - [`chain`]: ordered hops composed into `resolve_class`/`resolve_field`/`resolve_method`
//! - [`descriptor`]: JVM descriptor parsing and class-name rewriting
//! - [`tree`]: memoized view of a chain plus synthesized fact layers

pub mod chain;
pub mod descriptor;
pub mod table;
pub mod tree;

use thiserror::Error;

pub use chain::{MappingChain, Resolution};
pub use descriptor::{Descriptor, DescriptorError, FieldType, MethodDescriptor};
pub use table::{ClassEntry, FieldEntry, MappingTable, MethodEntry, NamespaceId};
pub use tree::{DeltaTree, Fact, FactConflict, FactKey, FactLayer, MappingTree};

/// Errors building or loading mapping tables.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("unknown namespace '{namespace}' (available: {})", available.join(", "))]
    UnknownNamespace {
        namespace: String,
        available: Vec<String>,
    },

    #[error("a mapping table needs a source and at least one destination namespace, found {found}")]
    TooFewNamespaces { found: usize },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unsupported mapping format: {header}")]
    UnsupportedFormat { header: String },
}

/// Convert an internal name (`a/b/C$D`) to its dotted source form (`a.b.C.D`).
pub fn to_source_name(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}

/// Convert an internal name to its binary dotted form (`a.b.C$D`).
pub fn to_binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Simple name of an internal class name: last `/` segment, then last `$` segment.
pub fn simple_name(internal: &str) -> &str {
    let tail = internal.rsplit('/').next().unwrap_or(internal);
    tail.rsplit('$').next().unwrap_or(tail)
}

/// Package part of an internal name, slash-separated (empty for the default package).
pub fn package_of(internal: &str) -> &str {
    internal.rfind('/').map(|i| &internal[..i]).unwrap_or("")
}
