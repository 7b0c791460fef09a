//! `fabric.mod.json` entrypoints.
//!
//! Entrypoints name a class (`pkg.Cls`) or a static member
//! (`pkg.Cls::member`). Classes become their new binary names; members are
//! checked across the field and every method of that name, since the
//! metadata does not say which one is meant.

use remap_core::ambiguity::{Candidates, Decision};
use remap_core::diagnostic::{Diagnostic, DiagnosticAnchor, DiagnosticKind};
use remap_core::mapping::to_binary_name;
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};

use crate::json::{parse_json, string_literal, JsonNode};

pub const MOD_JSON: &str = "fabric.mod.json";

#[derive(Debug, Default)]
pub struct ModJsonAdapter;

impl ModJsonAdapter {
    pub fn new() -> Self {
        ModJsonAdapter
    }
}

impl Adapter for ModJsonAdapter {
    fn name(&self) -> &'static str {
        "mod_json"
    }

    fn matches(&self, path: &str) -> bool {
        path.rsplit('/').next() == Some(MOD_JSON)
    }

    fn remap(&self, ctx: &mut StageContext<'_>) {
        let stages: [Stage<ModJsonAdapter, ()>; 1] = [Stage {
            name: "entrypoints",
            run: entrypoints,
        }];
        run_pipeline(self, &mut (), &stages, ctx);
    }
}

fn entrypoints(_: &ModJsonAdapter, _: &mut (), ctx: &mut StageContext<'_>) -> StageResult {
    let root = match parse_json(ctx.text()) {
        Ok(root) => root,
        Err(err) => {
            ctx.record(Diagnostic::new(DiagnosticKind::Invalid, DiagnosticAnchor::File, err.to_string()));
            return Ok(());
        }
    };

    match root.get("schemaVersion") {
        None => {
            ctx.report(
                DiagnosticKind::Invalid,
                DiagnosticAnchor::File,
                "no schemaVersion found, only version 1 is supported",
            );
            return Ok(());
        }
        Some(version) if version.as_i64() != Some(1) => {
            ctx.report(
                DiagnosticKind::Invalid,
                DiagnosticAnchor::Declaration(version.span.start),
                "only schemaVersion 1 is supported",
            );
            return Ok(());
        }
        Some(_) => {}
    }

    let Some(groups) = root.get("entrypoints").and_then(JsonNode::as_object) else {
        return Ok(());
    };
    for (_, group) in groups {
        for entry in group.as_array().unwrap_or_default() {
            let literal = match entry.get("value") {
                Some(value) => value,
                None => entry,
            };
            if literal.as_str().is_some() {
                remap_entrypoint(literal, ctx)?;
            }
        }
    }
    Ok(())
}

fn remap_entrypoint(literal: &JsonNode, ctx: &mut StageContext<'_>) -> StageResult {
    let Some(entrypoint) = literal.as_str() else {
        return Ok(());
    };
    let tree = ctx.tree();
    let (class, member) = match entrypoint.split_once("::") {
        Some((class, member)) => (class, Some(member)),
        None => (entrypoint, None),
    };
    let internal = class.replace('.', "/");
    if !tree.is_mapped_class(&internal) {
        return Ok(());
    }
    let new_class = tree
        .new_class_name(&internal)
        .map(|n| to_binary_name(&n))
        .unwrap_or_else(|| class.to_string());

    let new_entrypoint = match member {
        None => new_class,
        Some(member) => {
            let mut candidates = Candidates::new();
            if tree.has_field(&internal, member) {
                candidates.push(
                    format!("field {}", member),
                    tree.field_resolution(&internal, member).name_or(member),
                );
            }
            for (desc, resolution) in tree.method_overloads(&internal, member) {
                candidates.push(format!("method {}{}", member, desc), resolution.name_or(member));
            }
            let new_member = match candidates.decide(member) {
                Decision::Keep => member.to_string(),
                Decision::Rename(name) => name,
                Decision::Ambiguous(list) => {
                    ctx.ambiguous(
                        DiagnosticAnchor::Declaration(literal.span.start),
                        format!("members of entrypoint {} have different new names", entrypoint),
                        list,
                    );
                    return Ok(());
                }
            };
            format!("{}::{}", new_class, new_member)
        }
    };

    if new_entrypoint != entrypoint {
        ctx.replace(literal.span, string_literal(&new_entrypoint))?;
    }
    Ok(())
}
