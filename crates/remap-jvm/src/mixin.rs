//! Mixin annotation adapter.
//!
//! Mixin classes name their targets in strings: `@Mixin(targets = "...")`,
//! injector selectors, `@At` targets and accessor values. The Java adapter
//! never sees those strings, so this adapter rewrites them against the
//! classes each mixin declares as targets. `@Shadow` members are renamed by
//! synthesizing facts for the mixin class itself, which the Java adapter
//! picks up on the next round.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use remap_core::ambiguity::{Candidates, Decision};
use remap_core::diagnostic::{DiagnosticAnchor, DiagnosticKind};
use remap_core::mapping::tree::{Fact, MappingTree};
use remap_core::mapping::to_binary_name;
use remap_core::patch::Span;
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};

use crate::model::{AnnotatedElement, AnnotationDecl, AnnotationValue, JavaSource};
use crate::resolver::ReferenceResolver;
use crate::target::{MemberKind, Target, TargetError, TargetResolution};

const MIXIN_PACKAGE: &str = "org.spongepowered.asm.mixin.";
const MIXIN_EXTRAS_PACKAGE: &str = "com.llamalad7.mixinextras.";

const MIXIN: &str = "org.spongepowered.asm.mixin.Mixin";
const ACCESSOR: &str = "org.spongepowered.asm.mixin.gen.Accessor";
const INVOKER: &str = "org.spongepowered.asm.mixin.gen.Invoker";
const SHADOW: &str = "org.spongepowered.asm.mixin.Shadow";
const OVERWRITE: &str = "org.spongepowered.asm.mixin.Overwrite";
const AT: &str = "org.spongepowered.asm.mixin.injection.At";

const INJECTORS: &[&str] = &[
    "org.spongepowered.asm.mixin.injection.Inject",
    "org.spongepowered.asm.mixin.injection.ModifyArg",
    "org.spongepowered.asm.mixin.injection.ModifyArgs",
    "org.spongepowered.asm.mixin.injection.ModifyConstant",
    "org.spongepowered.asm.mixin.injection.ModifyVariable",
    "org.spongepowered.asm.mixin.injection.Redirect",
    "com.llamalad7.mixinextras.injector.wrapoperation.WrapOperation",
    "com.llamalad7.mixinextras.injector.ModifyExpressionValue",
    "com.llamalad7.mixinextras.injector.ModifyReturnValue",
    "com.llamalad7.mixinextras.injector.WrapWithCondition",
    "com.llamalad7.mixinextras.injector.v2.WrapWithCondition",
];

/// Annotations that carry no names to rewrite.
const PASSIVE: &[&str] = &[
    "org.spongepowered.asm.mixin.Unique",
    "org.spongepowered.asm.mixin.Final",
    "org.spongepowered.asm.mixin.Debug",
    "org.spongepowered.asm.mixin.Intrinsic",
    "org.spongepowered.asm.mixin.Mutable",
    "org.spongepowered.asm.mixin.Pseudo",
    "org.spongepowered.asm.mixin.Implements",
    "org.spongepowered.asm.mixin.Interface",
    "org.spongepowered.asm.mixin.injection.At",
    "org.spongepowered.asm.mixin.injection.Slice",
    "org.spongepowered.asm.mixin.injection.Coerce",
    "org.spongepowered.asm.mixin.injection.Constant",
    "org.spongepowered.asm.mixin.injection.Group",
    "com.llamalad7.mixinextras.sugar.Local",
    "com.llamalad7.mixinextras.sugar.Share",
    "com.llamalad7.mixinextras.sugar.Cancellable",
];

/// Injection points whose target names a method.
const INVOKE_POINTS: &[&str] = &["INVOKE", "INVOKE_ASSIGN"];
/// Injection points with no class or member target.
const PLAIN_POINTS: &[&str] = &[
    "HEAD", "RETURN", "TAIL", "JUMP", "CONSTANT", "STORE", "LOAD", "INVOKE_STRING",
];

const DEFAULT_SHADOW_PREFIX: &str = "shadow$";

pub struct MixinAdapter {
    resolver: Arc<dyn ReferenceResolver>,
}

impl MixinAdapter {
    pub fn new(resolver: Arc<dyn ReferenceResolver>) -> Self {
        MixinAdapter { resolver }
    }
}

fn is_mixin_annotation(annotation: &AnnotationDecl) -> bool {
    annotation.type_name.starts_with(MIXIN_PACKAGE) || annotation.type_name.starts_with(MIXIN_EXTRAS_PACKAGE)
}

struct MixinState<'s> {
    annotations: Vec<&'s AnnotationDecl>,
    /// Target classes (old internal names) per mixin class.
    targets: HashMap<String, Vec<String>>,
    /// Mixin classes declared with `remap = false`.
    unremapped: BTreeSet<String>,
}

impl<'s> MixinState<'s> {
    fn new(source: &'s JavaSource) -> Self {
        MixinState {
            annotations: source.annotations.iter().filter(|a| is_mixin_annotation(a)).collect(),
            targets: HashMap::new(),
            unremapped: BTreeSet::new(),
        }
    }

    /// Annotations of one kind that should be remapped.
    fn active(&self, kinds: &[&str]) -> Vec<&'s AnnotationDecl> {
        self.annotations
            .iter()
            .copied()
            .filter(|a| kinds.contains(&a.type_name.as_str()))
            .filter(|a| a.is_remapped() && !self.unremapped.contains(a.element.class_name()))
            .collect()
    }

    /// Targets of the mixin owning `annotation`, reporting when there are none.
    fn targets_for(&self, annotation: &AnnotationDecl, ctx: &mut StageContext<'_>) -> Option<Vec<String>> {
        match self.targets.get(annotation.element.class_name()) {
            Some(targets) if !targets.is_empty() => Some(targets.clone()),
            _ => {
                ctx.report(
                    DiagnosticKind::Unsupported,
                    DiagnosticAnchor::Declaration(annotation.anchor),
                    format!("could not determine a target for @{}", annotation.simple_name()),
                );
                None
            }
        }
    }
}

impl Adapter for MixinAdapter {
    fn name(&self) -> &'static str {
        "mixin"
    }

    fn matches(&self, path: &str) -> bool {
        path.ends_with(".java")
    }

    fn comment_prefix(&self) -> Option<&'static str> {
        Some("//")
    }

    fn remap(&self, ctx: &mut StageContext<'_>) {
        let artifact = ctx.artifact();
        let Some(source) = self.resolver.source(&artifact.path) else {
            return;
        };
        let mut state = MixinState::new(source);
        if state.annotations.is_empty() {
            return;
        }
        debug!(file = %artifact.path, annotations = state.annotations.len(), "remapping mixin annotations");
        let stages: [Stage<MixinAdapter, MixinState<'_>>; 5] = [
            Stage { name: "collect_targets", run: collect_targets },
            Stage { name: "accessors", run: accessors },
            Stage { name: "injectors", run: injectors },
            Stage { name: "shadows", run: shadows },
            Stage { name: "unknown_annotations", run: unknown_annotations },
        ];
        run_pipeline(self, &mut state, &stages, ctx);
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}

fn decapitalize(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// Put `value = "name"` into an annotation that has no value yet.
fn insert_value(annotation: &AnnotationDecl, name: &str, ctx: &mut StageContext<'_>) {
    match annotation.args {
        None => ctx.insert(annotation.span.end, format!("({})", quoted(name))),
        Some(args) if args.is_empty() || ctx.slice(args).is_some_and(|s| s.trim().is_empty()) => {
            ctx.insert(args.start, quoted(name));
        }
        Some(args) => ctx.insert(args.start, format!("value = {}, ", quoted(name))),
    }
}

fn report_target_error(err: TargetError, anchor: DiagnosticAnchor, ctx: &mut StageContext<'_>) {
    let kind = match err {
        TargetError::Unsupported { .. } => DiagnosticKind::Unsupported,
        TargetError::Invalid { .. } => DiagnosticKind::Invalid,
    };
    ctx.report(kind, anchor, err.to_string());
}

// ============================================================================
// Stages
// ============================================================================

fn collect_targets(_: &MixinAdapter, state: &mut MixinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for annotation in state.annotations.clone() {
        if annotation.type_name != MIXIN {
            continue;
        }
        let mixin = annotation.element.class_name().to_string();
        if !annotation.is_remapped() {
            state.unremapped.insert(mixin);
            continue;
        }
        let anchor = DiagnosticAnchor::Declaration(annotation.anchor);
        let mut targets = Vec::new();

        if let Some(value) = annotation.attribute("value") {
            for element in value.elements() {
                match element {
                    AnnotationValue::ClassLiteral { name, .. } => targets.push(name.clone()),
                    _ => ctx.unsupported(anchor, "mixin target is not a class literal"),
                }
            }
        }
        if let Some(value) = annotation.attribute("targets") {
            for element in value.elements() {
                match element {
                    AnnotationValue::String { value, span } => {
                        let old = value.replace('.', "/");
                        if let Some(new) = tree.new_class_name(&old) {
                            ctx.replace(*span, quoted(&to_binary_name(&new)))?;
                        }
                        targets.push(old);
                    }
                    _ => ctx.unsupported(anchor, "mixin target is not a string literal"),
                }
            }
        }
        debug!(%mixin, targets = targets.len(), "collected mixin targets");
        state.targets.entry(mixin).or_default().extend(targets);
    }
    Ok(())
}

fn accessors(_: &MixinAdapter, state: &mut MixinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for annotation in state.active(&[ACCESSOR, INVOKER]) {
        let AnnotatedElement::Method { name, desc, .. } = &annotation.element else {
            continue;
        };
        let anchor = DiagnosticAnchor::Declaration(annotation.anchor);
        let explicit = match annotation.attribute("value") {
            Some(AnnotationValue::String { value, span }) => Some((value.as_str(), *span)),
            _ => None,
        };
        let is_invoker = annotation.type_name == INVOKER;
        if is_invoker && explicit.is_some_and(|(v, _)| v == "<init>") {
            continue;
        }
        let Some(targets) = state.targets_for(annotation, ctx) else {
            continue;
        };

        // Member name and, for invokers, the descriptor written after it.
        let (member, member_desc) = match explicit {
            Some((value, _)) if is_invoker => match value.find('(') {
                Some(i) => (Some(value[..i].to_string()), Some(value[i..].to_string())),
                None => (Some(value.to_string()), None),
            },
            Some((value, _)) => (Some(value.to_string()), None),
            None => {
                let prefixes: &[&str] = if is_invoker { &["call", "invoke"] } else { &["get", "set", "is"] };
                let stripped = prefixes.iter().find_map(|p| name.strip_prefix(p));
                (stripped.and_then(decapitalize), None)
            }
        };
        let Some(member) = member else {
            let what = if is_invoker { "method" } else { "field" };
            ctx.unsupported(anchor, format!("no target {} for {}", what, name));
            continue;
        };

        let mut candidates = Candidates::new();
        for target in &targets {
            let (label, resolution) = if is_invoker {
                let lookup_desc = member_desc.as_deref().unwrap_or(desc);
                (
                    format!("{}#{}{}", target, member, lookup_desc),
                    tree.method_resolution(target, &member, lookup_desc),
                )
            } else {
                (format!("{}.{}", target, member), tree.field_resolution(target, &member))
            };
            if resolution.is_resolved() {
                candidates.push(label, resolution.name_or(&member));
            }
        }

        match candidates.decide(&member) {
            Decision::Keep => {
                if let (Some((_, span)), Some(d)) = (explicit, &member_desc) {
                    ctx.replace(span, quoted(&format!("{}{}", member, tree.remap_desc(d))))?;
                }
            }
            Decision::Rename(new) => match explicit {
                Some((_, span)) => {
                    let desc = member_desc.as_deref().map(|d| tree.remap_desc(d)).unwrap_or_default();
                    ctx.replace(span, quoted(&format!("{}{}", new, desc)))?;
                }
                None => insert_value(annotation, &new, ctx),
            },
            Decision::Ambiguous(list) => {
                ctx.ambiguous(anchor, format!("ambiguous rename of {} target {}", annotation.simple_name(), member), list);
            }
        }
    }
    Ok(())
}

fn injectors(_: &MixinAdapter, state: &mut MixinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for annotation in state.active(INJECTORS) {
        let anchor = DiagnosticAnchor::Declaration(annotation.anchor);
        if annotation.attribute("target").is_some() {
            ctx.unsupported(anchor, format!("@{} target descriptors are not supported", annotation.simple_name()));
            continue;
        }
        let owners = state.targets.get(annotation.element.class_name()).cloned().unwrap_or_default();

        if let Some(methods) = annotation.attribute("method") {
            for element in methods.elements() {
                match element {
                    AnnotationValue::String { value, span } => {
                        rewrite_target(tree, value, *span, &owners, MemberKind::Method, anchor, ctx)?;
                    }
                    _ => ctx.unsupported(anchor, "injector method is not a string literal"),
                }
            }
        }

        if let Some(at) = annotation.attribute("at") {
            for element in at.elements() {
                if let AnnotationValue::Annotation { annotation: inner } = element {
                    if inner.type_name == AT && inner.is_remapped() {
                        rewrite_at(tree, inner, &owners, anchor, ctx)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn rewrite_target(
    tree: &MappingTree,
    value: &str,
    span: Span,
    owners: &[String],
    kind: MemberKind,
    anchor: DiagnosticAnchor,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let target = match Target::parse(value) {
        Ok(target) => target,
        Err(err) => {
            report_target_error(err, anchor, ctx);
            return Ok(());
        }
    };
    match target.resolve(tree, owners, kind) {
        TargetResolution::Resolved(new) => ctx.replace(span, quoted(&new.to_string())),
        TargetResolution::Ambiguous(list) => {
            ctx.ambiguous(anchor, format!("ambiguous rename of target {}", value), list);
            Ok(())
        }
        TargetResolution::NoOwner => {
            ctx.unsupported(anchor, format!("could not determine the owner of target {}", value));
            Ok(())
        }
    }
}

fn rewrite_at(
    tree: &MappingTree,
    at: &AnnotationDecl,
    owners: &[String],
    anchor: DiagnosticAnchor,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let Some(point) = at.attribute("value").and_then(AnnotationValue::as_str) else {
        return Ok(());
    };
    if at.attribute("desc").is_some() {
        ctx.unsupported(anchor, "@At desc is not supported");
        return Ok(());
    }
    if at.attribute("args").is_some() {
        ctx.unsupported(anchor, "@At args are not supported");
    }
    let kind = if INVOKE_POINTS.contains(&point) {
        Some(MemberKind::Method)
    } else if point == "FIELD" {
        Some(MemberKind::Field)
    } else if point == "NEW" {
        None
    } else if PLAIN_POINTS.contains(&point) {
        return Ok(());
    } else {
        ctx.unsupported(anchor, format!("unknown injection point {}", point));
        return Ok(());
    };
    let Some(AnnotationValue::String { value, span }) = at.attribute("target") else {
        return Ok(());
    };

    match kind {
        Some(kind) => rewrite_target(tree, value, *span, owners, kind, anchor, ctx),
        None => {
            let new = if value.starts_with('(') {
                tree.remap_desc(value)
            } else if let Some(inner) = value.strip_prefix('L').and_then(|v| v.strip_suffix(';')) {
                format!("L{};", tree.new_class_name(inner).unwrap_or_else(|| inner.to_string()))
            } else {
                let internal = value.replace('.', "/");
                match tree.new_class_name(&internal) {
                    Some(new) if value.contains('.') => to_binary_name(&new),
                    Some(new) => new,
                    None => value.clone(),
                }
            };
            ctx.replace(*span, quoted(&new))
        }
    }
}

fn shadows(_: &MixinAdapter, state: &mut MixinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for annotation in state.active(&[SHADOW, OVERWRITE]) {
        let anchor = DiagnosticAnchor::Declaration(annotation.anchor);
        if ["alias", "aliases"].iter().any(|a| annotation.attribute(a).is_some()) {
            ctx.unsupported(anchor, "@Shadow alias is not supported");
            continue;
        }
        let Some(targets) = state.targets_for(annotation, ctx) else {
            continue;
        };
        let prefix = annotation
            .attribute("prefix")
            .and_then(AnnotationValue::as_str)
            .unwrap_or(DEFAULT_SHADOW_PREFIX);

        let (owner, name) = match &annotation.element {
            AnnotatedElement::Field { owner, name } | AnnotatedElement::Method { owner, name, .. } => (owner, name),
            AnnotatedElement::Class { .. } => continue,
        };
        let (has_prefix, target_name) = match name.strip_prefix(prefix) {
            Some(rest) if annotation.type_name == SHADOW => (true, rest),
            _ => (false, name.as_str()),
        };

        let mut candidates = Candidates::new();
        for target in &targets {
            let (label, resolution) = match &annotation.element {
                AnnotatedElement::Method { desc, .. } => (
                    format!("{}#{}{}", target, target_name, desc),
                    tree.method_resolution(target, target_name, desc),
                ),
                _ => (format!("{}.{}", target, target_name), tree.field_resolution(target, target_name)),
            };
            if resolution.is_resolved() {
                candidates.push(label, resolution.name_or(target_name));
            }
        }

        match candidates.decide(target_name) {
            Decision::Keep => {}
            Decision::Rename(new) => {
                let new = if has_prefix { format!("{}{}", prefix, new) } else { new };
                let fact = match &annotation.element {
                    AnnotatedElement::Method { desc, .. } => Fact::method(owner.clone(), name.clone(), desc.clone(), new),
                    _ => Fact::field(owner.clone(), name.clone(), new),
                };
                ctx.rerun(fact);
            }
            Decision::Ambiguous(list) => {
                ctx.ambiguous(anchor, format!("ambiguous rename of shadowed member {}", name), list);
            }
        }
    }
    Ok(())
}

fn unknown_annotations(_: &MixinAdapter, state: &mut MixinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    for annotation in &state.annotations {
        let type_name = annotation.type_name.as_str();
        let handled = type_name == MIXIN
            || [ACCESSOR, INVOKER, SHADOW, OVERWRITE].contains(&type_name)
            || INJECTORS.contains(&type_name)
            || PASSIVE.contains(&type_name);
        if handled || !annotation.is_remapped() {
            continue;
        }
        ctx.unsupported(
            DiagnosticAnchor::Declaration(annotation.anchor),
            format!("no remapping support for @{}", type_name),
        );
    }
    Ok(())
}
