//! Access widener / class tweaker files.
//!
//! ```text
//! accessWidener v2 named
//! accessible class net/minecraft/Foo
//! transitive-mutable field net/minecraft/Foo bar I
//! accessible method net/minecraft/Foo baz (Lnet/minecraft/Bar;)V  # comment
//! inject-interface net/minecraft/Foo com/example/Iface
//! ```
//!
//! Each entry is rewritten in place: owner, member name and descriptor.
//! Modifiers, spacing and trailing comments are kept.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use remap_core::diagnostic::{Diagnostic, DiagnosticAnchor, DiagnosticKind};
use remap_core::mapping::tree::MappingTree;
use remap_core::patch::Span;
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};
use remap_core::text::line_end;

static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z]+)\s+v(\d+)\s+(\w+)\s*$").unwrap());
static CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([\w-]+\s+class\s+)([\w/$]+)(.*)$").unwrap());
static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+\s+field\s+)([\w/$]+)(\s+)([\w$]+)(\s+)([\w/$;\[]+)(.*)$").unwrap()
});
static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+\s+method\s+)([\w/$]+)(\s+)([\w$<>]+)(\s+)([\w/$;\[()]+)(.*)$").unwrap()
});
static INJECT_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w-]*inject-interface\s+)([\w/$]+)(\s+)([\w/$]+)(.*)$").unwrap());

#[derive(Debug, Default)]
pub struct ClassTweakerAdapter;

impl ClassTweakerAdapter {
    pub fn new() -> Self {
        ClassTweakerAdapter
    }
}

/// Whether `format vN` is a version this adapter understands.
fn supported(format: &str, version: u32) -> bool {
    match format {
        "accessWidener" => (1..=2).contains(&version),
        "classTweaker" => version == 1,
        _ => false,
    }
}

impl Adapter for ClassTweakerAdapter {
    fn name(&self) -> &'static str {
        "class_tweaker"
    }

    fn matches(&self, path: &str) -> bool {
        path.ends_with(".accesswidener") || path.ends_with(".classtweaker") || path.ends_with(".ct")
    }

    fn comment_prefix(&self) -> Option<&'static str> {
        Some("#")
    }

    /// Comments go right after the header line.
    fn file_comment_offset(&self, text: &str) -> u64 {
        line_end(text, 0)
    }

    fn remap(&self, ctx: &mut StageContext<'_>) {
        let stages: [Stage<ClassTweakerAdapter, bool>; 2] = [
            Stage { name: "header", run: header },
            Stage { name: "entries", run: entries },
        ];
        run_pipeline(self, &mut false, &stages, ctx);
    }
}

/// Validate the header and rewrite its namespace. Sets `valid` only when
/// the file is written in the chain's source namespace.
fn header(_: &ClassTweakerAdapter, valid: &mut bool, ctx: &mut StageContext<'_>) -> StageResult {
    let text = ctx.text();
    let first = text.lines().next().unwrap_or("");
    let Some(caps) = HEADER.captures(first) else {
        ctx.record(Diagnostic::new(
            DiagnosticKind::Invalid,
            DiagnosticAnchor::File,
            "missing or malformed class tweaker header",
        ));
        return Ok(());
    };
    let format = &caps[1];
    let version: u32 = caps[2].parse().unwrap_or(0);
    if !supported(format, version) {
        debug!(file = %ctx.path(), format, version, "unsupported class tweaker version");
        ctx.record(Diagnostic::new(
            DiagnosticKind::Invalid,
            DiagnosticAnchor::File,
            format!("unsupported header {} v{}", format, version),
        ));
        return Ok(());
    }

    let chain = ctx.tree().chain();
    let (Some(namespace), Some(source), Some(target)) = (
        caps.get(3),
        chain.hops().first().map(|hop| hop.source_namespace()),
        chain.final_namespace(),
    ) else {
        return Ok(());
    };
    if namespace.as_str() == target {
        debug!(file = %ctx.path(), namespace = target, "class tweaker already uses the target namespace");
        return Ok(());
    }
    if namespace.as_str() != source {
        ctx.record(Diagnostic::new(
            DiagnosticKind::Invalid,
            DiagnosticAnchor::File,
            format!(
                "header namespace {} does not match the mapping source namespace {}",
                namespace.as_str(),
                source
            ),
        ));
        return Ok(());
    }
    *valid = true;
    ctx.replace(Span::new(namespace.start() as u64, namespace.end() as u64), target)
}

fn entries(_: &ClassTweakerAdapter, valid: &mut bool, ctx: &mut StageContext<'_>) -> StageResult {
    if !*valid {
        return Ok(());
    }
    let tree = ctx.tree();
    let text = ctx.text();
    let mut offset = 0u64;
    for (index, raw) in text.split_inclusive('\n').enumerate() {
        let line_offset = offset;
        offset += raw.len() as u64;
        let line = raw.trim_end_matches(['\n', '\r']);
        if index == 0 || line.trim_start().starts_with('#') || line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = CLASS.captures(line) {
            rewrite_class(tree, group_at(&caps, 2, line_offset), ctx)?;
        } else if let Some(caps) = FIELD.captures(line) {
            let owner = group_at(&caps, 2, line_offset);
            if let (Some((_, class)), Some((span, name))) = (owner, group_at(&caps, 4, line_offset)) {
                if let Some(new) = tree.new_field_name(class, name) {
                    ctx.replace(span, new)?;
                }
            }
            rewrite_class(tree, owner, ctx)?;
            rewrite_desc(tree, group_at(&caps, 6, line_offset), ctx)?;
        } else if let Some(caps) = METHOD.captures(line) {
            let owner = group_at(&caps, 2, line_offset);
            let desc = group_at(&caps, 6, line_offset);
            if let (Some((_, class)), Some((span, name)), Some((_, desc))) = (owner, group_at(&caps, 4, line_offset), desc) {
                if let Some(new) = tree.new_method_name(class, name, desc) {
                    ctx.replace(span, new)?;
                }
            }
            rewrite_class(tree, owner, ctx)?;
            rewrite_desc(tree, desc, ctx)?;
        } else if let Some(caps) = INJECT_INTERFACE.captures(line) {
            rewrite_class(tree, group_at(&caps, 2, line_offset), ctx)?;
            rewrite_class(tree, group_at(&caps, 4, line_offset), ctx)?;
        } else {
            debug!(file = %ctx.path(), line = index + 1, "unrecognized class tweaker entry");
        }
    }
    Ok(())
}

/// Capture group `i` with its span in the whole file.
fn group_at<'h>(caps: &Captures<'h>, i: usize, line_offset: u64) -> Option<(Span, &'h str)> {
    caps.get(i).map(|m| {
        (
            Span::new(line_offset + m.start() as u64, line_offset + m.end() as u64),
            m.as_str(),
        )
    })
}

fn rewrite_class(tree: &MappingTree, group: Option<(Span, &str)>, ctx: &mut StageContext<'_>) -> StageResult {
    match group {
        Some((span, class)) => match tree.new_class_name(class) {
            Some(new) => ctx.replace(span, new),
            None => Ok(()),
        },
        None => Ok(()),
    }
}

fn rewrite_desc(tree: &MappingTree, group: Option<(Span, &str)>, ctx: &mut StageContext<'_>) -> StageResult {
    match group {
        Some((span, desc)) => ctx.replace(span, tree.remap_desc(desc)),
        None => Ok(()),
    }
}
