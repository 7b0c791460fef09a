//! CLI command implementations.
//!
//! Each command returns a response struct; `main` serializes it. Keeping the
//! commands here lets tests drive them without spawning the binary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use remap_core::artifact::FsArtifactStore;
use remap_core::coordinator::Coordinator;
use remap_core::error::RemapError;
use remap_core::mapping::chain::MappingChain;
use remap_core::mapping::tree::MappingTree;
use remap_core::output::{NamespacesResponse, RemapResponse, TargetResponse};
use remap_jvm::target::{MemberKind, Target, TargetResolution};
use remap_jvm::{default_adapters, SourceIndex, SymbolTable};

use crate::config::{MappingSpec, ResolvedConfig};
use crate::mappings::load_table;

// ============================================================================
// Loading
// ============================================================================

/// Build the mapping chain from hop specs, in order.
///
/// A hop without `from` reads from the previous hop's target namespace when
/// the file has it, else from the file's source namespace. A hop without `to`
/// maps to the file's last namespace other than `from`.
pub fn load_chain(specs: &[MappingSpec]) -> Result<MappingChain, RemapError> {
    if specs.is_empty() {
        return Err(RemapError::invalid_args(
            "no mappings given: pass --mapping or add [[mappings]] to remap.toml",
        ));
    }
    let mut chain = MappingChain::new();
    for spec in specs {
        let table = load_table(&spec.path)?;
        let namespaces = table.namespaces();
        let from = match &spec.from {
            Some(from) => from.clone(),
            None => chain
                .final_namespace()
                .filter(|prev| namespaces.iter().any(|ns| ns == prev))
                .unwrap_or_else(|| table.source_namespace())
                .to_string(),
        };
        let to = match &spec.to {
            Some(to) => to.clone(),
            None => namespaces
                .iter()
                .rev()
                .find(|ns| **ns != from)
                .cloned()
                .ok_or_else(|| RemapError::invalid_args(format!("{}: no target namespace", spec.path.display())))?,
        };
        debug!(path = %spec.path.display(), %from, %to, "adding chain hop");
        chain.push(&table, &from, &to)?;
    }
    Ok(chain)
}

/// Read the source index a host wrote as JSON, or an empty index.
pub fn load_index(path: Option<&Path>) -> Result<SourceIndex, RemapError> {
    let Some(path) = path else {
        return Ok(SourceIndex::default());
    };
    let text = fs::read_to_string(path).map_err(|_| RemapError::file_not_found(path.display().to_string()))?;
    let index: SourceIndex = serde_json::from_str(&text)
        .map_err(|e| RemapError::invalid_args(format!("invalid source index {}: {}", path.display(), e)))?;
    debug!(
        path = %path.display(),
        files = index.files.len(),
        libraries = index.libraries.len(),
        "loaded source index"
    );
    Ok(index)
}

// ============================================================================
// Commands
// ============================================================================

/// `remap run`: resolve the workspace and optionally write the result.
pub fn run_remap(workspace: &Path, config: &ResolvedConfig, apply: bool) -> Result<RemapResponse, RemapError> {
    let chain = Arc::new(load_chain(&config.mapping_specs())?);
    let index = load_index(config.index_path())?;
    let resolver = Arc::new(SymbolTable::new(index));
    let coordinator = Coordinator::new(default_adapters(resolver)).with_options(config.run_options());

    let mut store = FsArtifactStore::new(workspace, config.filter()?);
    let plan = coordinator.resolve(&store, chain)?;
    info!(
        rounds = plan.rounds,
        converged = plan.converged,
        patches = plan.patches.len(),
        diagnostics = plan.diagnostics.len(),
        "remap resolved"
    );

    if !apply {
        return Ok(RemapResponse::from_plan(&plan));
    }
    let report = coordinator.write(&mut store, &plan)?;
    info!(files = report.files_written.len(), "remap applied");
    Ok(RemapResponse::with_apply(&plan, &report))
}

/// `remap namespaces`: list the namespaces a mapping file declares.
pub fn list_namespaces(path: &Path) -> Result<NamespacesResponse, RemapError> {
    let table = load_table(path)?;
    Ok(NamespacesResponse::new(
        path.display().to_string(),
        table.namespaces().to_vec(),
        table.class_count(),
    ))
}

/// `remap target`: rewrite one member target string through the chain.
pub fn resolve_target(input: &str, specs: &[MappingSpec], owner: Option<&str>) -> Result<TargetResponse, RemapError> {
    let target = Target::parse(input).map_err(|e| RemapError::invalid_args(e.to_string()))?;
    let chain = Arc::new(load_chain(specs)?);
    let tree = MappingTree::new(chain);
    let owners: Vec<String> = owner.map(|o| o.replace('.', "/")).into_iter().collect();

    let response = match target.resolve(&tree, &owners, MemberKind::Any) {
        TargetResolution::Resolved(resolved) => TargetResponse::resolved(input, resolved.to_string()),
        TargetResolution::Ambiguous(candidates) => {
            let labels: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} -> {}", c.label, c.new_name))
                .collect();
            TargetResponse::unresolved(input, format!("ambiguous: {}", labels.join(", ")))
        }
        TargetResolution::NoOwner => {
            TargetResponse::unresolved(input, "target has no owner; pass --owner")
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TINY: &str = "tiny\t2\t0\tofficial\tintermediary\tnamed\n\
                        c\ta\tnet/C_1\tnet/Foo\n\
                        \tm\t()V\tb\tm_1\ttick\n\
                        \tm\t(I)V\tb\tm_2\ttickMany\n";

    fn write_tiny(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("mappings.tiny");
        fs::write(&path, TINY).unwrap();
        path
    }

    fn spec(path: PathBuf, from: Option<&str>, to: Option<&str>) -> MappingSpec {
        MappingSpec {
            path,
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    mod load_chain_tests {
        use super::*;

        #[test]
        fn defaults_to_source_and_last_namespace() {
            let dir = TempDir::new().unwrap();
            let chain = load_chain(&[spec(write_tiny(&dir), None, None)]).unwrap();
            assert_eq!(chain.final_namespace(), Some("named"));
            assert_eq!(chain.resolve_class("a").new_name(), Some("net/Foo"));
        }

        #[test]
        fn later_hops_continue_from_the_previous_target() {
            let dir = TempDir::new().unwrap();
            let path = write_tiny(&dir);
            let chain = load_chain(&[
                spec(path.clone(), Some("official"), Some("intermediary")),
                spec(path, None, Some("named")),
            ])
            .unwrap();
            assert_eq!(chain.hops().len(), 2);
            assert_eq!(chain.resolve_class("a").new_name(), Some("net/Foo"));
        }

        #[test]
        fn empty_chain_is_invalid() {
            let err = load_chain(&[]).unwrap_err();
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn unknown_namespace_is_a_mapping_error() {
            let dir = TempDir::new().unwrap();
            let err = load_chain(&[spec(write_tiny(&dir), Some("mojang"), None)]).unwrap_err();
            assert!(matches!(err, RemapError::Mapping { .. }), "{err}");
        }
    }

    mod target_tests {
        use super::*;

        #[test]
        fn owned_target_is_rewritten() {
            let dir = TempDir::new().unwrap();
            let specs = [spec(write_tiny(&dir), None, None)];
            let response = resolve_target("La;b()V", &specs, None).unwrap();
            assert_eq!(response.output.as_deref(), Some("Lnet/Foo;tick()V"));
            assert!(response.changed);
        }

        #[test]
        fn bare_overloaded_name_is_ambiguous() {
            let dir = TempDir::new().unwrap();
            let specs = [spec(write_tiny(&dir), None, None)];
            let response = resolve_target("b", &specs, Some("a")).unwrap();
            assert!(response.output.is_none());
            assert!(response.reason.unwrap().starts_with("ambiguous"));
        }

        #[test]
        fn ownerless_target_is_unresolved() {
            let dir = TempDir::new().unwrap();
            let specs = [spec(write_tiny(&dir), None, None)];
            let response = resolve_target("b()V", &specs, None).unwrap();
            assert!(!response.changed);
            assert!(response.reason.is_some());
        }

        #[test]
        fn malformed_target_is_invalid() {
            let dir = TempDir::new().unwrap();
            let specs = [spec(write_tiny(&dir), None, None)];
            let err = resolve_target("", &specs, None).unwrap_err();
            assert_eq!(err.error_code().code(), 2);
        }
    }

    #[test]
    fn namespaces_are_listed() {
        let dir = TempDir::new().unwrap();
        let response = list_namespaces(&write_tiny(&dir)).unwrap();
        assert_eq!(response.namespaces, ["official", "intermediary", "named"]);
        assert_eq!(response.class_count, 1);
    }

    #[test]
    fn missing_index_is_file_not_found() {
        let err = load_index(Some(Path::new("/nonexistent/index.json"))).unwrap_err();
        assert!(matches!(err, RemapError::FileNotFound { .. }));
    }
}
