//! Mixin config files (`modid.mixins.json`).
//!
//! Entries are class names relative to `package`. When mixin classes move,
//! the package becomes the longest package all new names share and every
//! entry is rewritten relative to it.

use remap_core::diagnostic::{Candidate, Diagnostic, DiagnosticAnchor, DiagnosticKind};
use remap_core::mapping::{package_of, to_binary_name};
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};
use tracing::debug;

use crate::json::{parse_json, string_literal, JsonNode};

const ENTRY_LISTS: [&str; 3] = ["mixins", "client", "server"];

#[derive(Debug, Default)]
pub struct MixinConfigAdapter;

impl MixinConfigAdapter {
    pub fn new() -> Self {
        MixinConfigAdapter
    }
}

impl Adapter for MixinConfigAdapter {
    fn name(&self) -> &'static str {
        "mixin_config"
    }

    fn matches(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        file.ends_with(".mixins.json")
            || file.ends_with(".mixin.json")
            || (file.starts_with("mixins.") && file.ends_with(".json"))
    }

    fn remap(&self, ctx: &mut StageContext<'_>) {
        let stages: [Stage<MixinConfigAdapter, ()>; 1] = [Stage {
            name: "package",
            run: package,
        }];
        run_pipeline(self, &mut (), &stages, ctx);
    }
}

/// An entry with its old and new internal names.
struct Entry<'d> {
    node: &'d JsonNode,
    old: String,
    new: String,
}

fn package(_: &MixinConfigAdapter, _: &mut (), ctx: &mut StageContext<'_>) -> StageResult {
    let root = match parse_json(ctx.text()) {
        Ok(root) => root,
        Err(err) => {
            ctx.record(Diagnostic::new(DiagnosticKind::Invalid, DiagnosticAnchor::File, err.to_string()));
            return Ok(());
        }
    };
    let Some(package_node) = root.get("package") else {
        return Ok(());
    };
    let Some(package) = package_node.as_str().filter(|p| p.contains("mixin")) else {
        debug!(file = %ctx.path(), "mixin config package does not look like a mixin package");
        return Ok(());
    };

    let tree = ctx.tree();
    let mut entries = Vec::new();
    for list in ENTRY_LISTS {
        let Some(items) = root.get(list).and_then(JsonNode::as_array) else {
            continue;
        };
        for node in items {
            let Some(name) = node.as_str() else { continue };
            let old = format!("{}.{}", package, name).replace('.', "/");
            let new = tree.new_class_name(&old).unwrap_or_else(|| old.clone());
            entries.push(Entry { node, old, new });
        }
    }
    if entries.iter().all(|e| e.old == e.new) {
        return Ok(());
    }

    let old_package = package.replace('.', "/");
    let new_package = if entries.iter().all(|e| e.new.starts_with(&format!("{}/", old_package))) {
        old_package
    } else {
        common_package(entries.iter().map(|e| e.new.as_str()))
    };
    if new_package.is_empty() {
        let candidates = entries
            .iter()
            .map(|e| Candidate {
                label: to_binary_name(&e.old),
                new_name: to_binary_name(&e.new),
            })
            .collect();
        ctx.ambiguous(
            DiagnosticAnchor::File,
            "mixin classes no longer share a package",
            candidates,
        );
        return Ok(());
    }

    ctx.replace(package_node.span, string_literal(&to_binary_name(&new_package)))?;
    for entry in &entries {
        let relative = &entry.new[new_package.len() + 1..];
        ctx.replace(entry.node.span, string_literal(&to_binary_name(relative)))?;
    }
    Ok(())
}

/// Longest slash-separated package prefix shared by every name.
fn common_package<'n>(mut names: impl Iterator<Item = &'n str>) -> String {
    let Some(first) = names.next() else {
        return String::new();
    };
    let mut shared: Vec<&str> = package_of(first).split('/').filter(|s| !s.is_empty()).collect();
    for name in names {
        let segments: Vec<&str> = package_of(name).split('/').collect();
        let keep = shared
            .iter()
            .zip(&segments)
            .take_while(|(a, b)| a == b)
            .count();
        shared.truncate(keep);
    }
    shared.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_core::mapping::chain::MappingChain;
    use remap_core::mapping::table::{ClassEntry, MappingTable};
    use remap_core::mapping::tree::{DeltaTree, MappingTree};
    use remap_core::stage::{Artifact, ArtifactOutcome};
    use std::sync::Arc;

    fn run(text: &str, classes: &[(&str, &str)]) -> ArtifactOutcome {
        let mut t = MappingTable::new(vec!["old".to_string(), "new".to_string()]).unwrap();
        for (old, new) in classes {
            t.insert_class(ClassEntry::new(vec![old.to_string(), new.to_string()]));
        }
        let tree = MappingTree::new(Arc::new(MappingChain::new().with_hop(&t, "old", "new").unwrap()));
        let artifact = Artifact::new("resources/example.mixins.json", text);
        let delta = DeltaTree::new();
        let mut ctx = StageContext::new(&artifact, &tree, &delta);
        ctx.run_adapter(&MixinConfigAdapter::new());
        ctx.finish()
    }

    const CONFIG: &str = r#"{
  "package": "com.example.mixin",
  "mixins": ["MobMixin", "client.ScreenMixin"],
  "client": [],
  "compatibilityLevel": "JAVA_17"
}"#;

    #[test]
    fn moved_package_rewrites_package_and_entries() {
        let outcome = run(
            CONFIG,
            &[
                ("com/example/mixin/MobMixin", "org/example/mixins/MobMixin"),
                ("com/example/mixin/client/ScreenMixin", "org/example/mixins/client/ScreenMixin"),
            ],
        );
        assert!(outcome.diagnostics.is_empty());
        let out = outcome.patch.apply(CONFIG).unwrap();
        assert!(out.contains(r#""package": "org.example.mixins""#));
        assert!(out.contains(r#""mixins": ["MobMixin", "client.ScreenMixin"]"#));
    }

    #[test]
    fn renamed_class_keeps_package() {
        let outcome = run(CONFIG, &[("com/example/mixin/MobMixin", "com/example/mixin/EntityMixin")]);
        let out = outcome.patch.apply(CONFIG).unwrap();
        assert!(out.contains(r#""package": "com.example.mixin""#));
        assert!(out.contains(r#""mixins": ["EntityMixin", "client.ScreenMixin"]"#));
    }

    #[test]
    fn diverging_packages_are_ambiguous() {
        let outcome = run(
            CONFIG,
            &[
                ("com/example/mixin/MobMixin", "left/MobMixin"),
                ("com/example/mixin/client/ScreenMixin", "right/ScreenMixin"),
            ],
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::Ambiguous);
        assert!(outcome.patch.edits.is_empty());
    }

    #[test]
    fn unchanged_config_has_no_edits() {
        assert!(run(CONFIG, &[]).patch.edits.is_empty());
    }

    #[test]
    fn config_file_names() {
        let adapter = MixinConfigAdapter::new();
        assert!(adapter.matches("a/example.mixins.json"));
        assert!(adapter.matches("mixins.example.json"));
        assert!(adapter.matches("example.mixin.json"));
        assert!(!adapter.matches("fabric.mod.json"));
    }
}
