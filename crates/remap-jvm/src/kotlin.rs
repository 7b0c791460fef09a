//! Kotlin source adapter.
//!
//! Reads the same [`JavaSource`] model as the Java adapter, with these
//! conventions for `.kt` files:
//!
//! - a property is a [`FieldDecl`](crate::model::FieldDecl) whose span
//!   covers the property name; its getter and setter are listed as methods
//!   without a name span
//! - top-level functions and properties belong to the file facade class
//!   (`a/UtilKt`)
//! - a member import carries the owner in `class_name` and the member name
//!   span in `member_span`
//! - Java getters and setters used with property syntax are references with
//!   [`RefContext::Property`]
//!
//! A property's new name can come from its field mapping or from any Java
//! accessor its getter or setter overrides. Package and file location are
//! left alone: Kotlin does not tie them to class names.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use remap_core::ambiguity::{Candidates, Decision};
use remap_core::diagnostic::DiagnosticAnchor;
use remap_core::mapping::tree::MappingTree;
use remap_core::mapping::{package_of, simple_name, to_source_name};
use remap_core::patch::Span;
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};

use crate::java::{declared_members, method_decision};
use crate::model::{JavaSource, RefContext, ReferenceSite, Symbol};
use crate::resolver::ReferenceResolver;

/// Hard keywords; as identifiers they need backticks.
const KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in", "interface", "is", "null",
    "object", "package", "return", "super", "this", "throw", "true", "try", "typealias", "typeof", "val", "var",
    "when", "while",
];

pub struct KotlinAdapter {
    resolver: Arc<dyn ReferenceResolver>,
}

impl KotlinAdapter {
    pub fn new(resolver: Arc<dyn ReferenceResolver>) -> Self {
        KotlinAdapter { resolver }
    }
}

struct KotlinState<'s> {
    source: &'s JavaSource,
    /// Old internal names of explicitly imported classes.
    imported: BTreeSet<String>,
    /// Unqualified member uses, by member name.
    member_usages: BTreeMap<String, BTreeSet<Symbol>>,
}

impl Adapter for KotlinAdapter {
    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn matches(&self, path: &str) -> bool {
        path.ends_with(".kt")
    }

    fn comment_prefix(&self) -> Option<&'static str> {
        Some("//")
    }

    fn remap(&self, ctx: &mut StageContext<'_>) {
        let artifact = ctx.artifact();
        let Some(source) = self.resolver.source(&artifact.path) else {
            debug!(file = %artifact.path, "no source model, skipping");
            return;
        };
        let stages: [Stage<KotlinAdapter, KotlinState<'_>>; 5] = [
            Stage { name: "collect_imports", run: collect_imports },
            Stage { name: "rename_classes", run: rename_classes },
            Stage { name: "rename_members", run: rename_members },
            Stage { name: "rename_references", run: rename_references },
            Stage { name: "rename_member_imports", run: rename_member_imports },
        ];
        let mut state = KotlinState {
            source,
            imported: BTreeSet::new(),
            member_usages: BTreeMap::new(),
        };
        run_pipeline(self, &mut state, &stages, ctx);
    }
}

// ============================================================================
// Names
// ============================================================================

fn quote_if_needed(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("`{}`", name)
    } else {
        name.to_string()
    }
}

fn quote_path(dotted: &str) -> String {
    dotted.split('.').map(quote_if_needed).collect::<Vec<_>>().join(".")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `rest` of `{prefix}Rest`, when `Rest` starts upper-case.
fn bean_suffix<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    name.strip_prefix(prefix)
        .filter(|rest| rest.chars().next().is_some_and(|c| c.is_uppercase()))
}

fn is_prefixed(name: &str) -> bool {
    bean_suffix(name, "is").is_some()
}

/// The JVM getter or setter of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Accessor {
    name: String,
    desc: String,
    setter: bool,
    /// The property is named `isX`.
    boolean_style: bool,
}

impl Accessor {
    fn of(property: &str, desc: &str) -> [Accessor; 2] {
        let boolean_style = is_prefixed(property);
        let (getter, setter) = if boolean_style {
            (property.to_string(), format!("set{}", &property[2..]))
        } else {
            (format!("get{}", capitalize(property)), format!("set{}", capitalize(property)))
        };
        [
            Accessor {
                name: getter,
                desc: format!("(){}", desc),
                setter: false,
                boolean_style,
            },
            Accessor {
                name: setter,
                desc: format!("({})V", desc),
                setter: true,
                boolean_style,
            },
        ]
    }

    /// The property name an accessor renamed to `method` implies.
    fn property_name(&self, method: &str) -> Option<String> {
        if self.setter {
            let rest = bean_suffix(method, "set")?;
            return Some(if self.boolean_style {
                format!("is{}", rest)
            } else {
                decapitalize(rest)
            });
        }
        match bean_suffix(method, "get") {
            Some(rest) => Some(decapitalize(rest)),
            None if is_prefixed(method) => Some(method.to_string()),
            None => None,
        }
    }
}

/// Decide the new name of property `owner.name`.
///
/// Each accessor origin proposes the property name its new method name
/// implies; the field mapping proposes its own. `Err` carries the message
/// when an accessor is renamed to something that is not an accessor name.
fn property_decision(
    resolver: &dyn ReferenceResolver,
    tree: &MappingTree,
    owner: &str,
    name: &str,
) -> Result<Decision, String> {
    let mut candidates = Candidates::new();
    let class = resolver.class(owner);
    if let Some(field) = class.and_then(|c| c.field(name)) {
        for accessor in Accessor::of(name, &field.desc) {
            let declared = class.is_some_and(|c| c.method(&accessor.name, &accessor.desc).is_some());
            let mut origins = resolver.deepest_super_methods(owner, &accessor.name, &accessor.desc);
            if origins.is_empty() && declared {
                origins.push(owner.to_string());
            }
            for origin in origins {
                let resolution = tree.method_resolution(&origin, &accessor.name, &accessor.desc);
                if !resolution.is_resolved() {
                    continue;
                }
                let new = resolution.name_or(&accessor.name);
                let property = accessor.property_name(new).ok_or_else(|| {
                    format!(
                        "property {} overrides {}#{}{}, renamed to {} which is not a getter or setter name",
                        name, origin, accessor.name, accessor.desc, new
                    )
                })?;
                candidates.push(format!("{}#{}{}", origin, accessor.name, accessor.desc), property);
            }
        }
    }
    let field = tree.field_resolution(owner, name);
    if field.is_resolved() || candidates.is_empty() {
        candidates.push(format!("{}.{}", owner, name), field.name_or(name));
    }
    Ok(candidates.decide(name))
}

fn apply_decision(
    ctx: &mut StageContext<'_>,
    decision: Decision,
    span: Span,
    anchor: DiagnosticAnchor,
    what: &str,
) -> StageResult {
    let decision = match decision {
        Decision::Rename(new) => Decision::Rename(quote_if_needed(&new)),
        other => other,
    };
    ctx.apply_decision(decision, span, anchor, what).map(|_| ())
}

// ============================================================================
// Stages
// ============================================================================

fn collect_imports(_: &KotlinAdapter, state: &mut KotlinState<'_>, _: &mut StageContext<'_>) -> StageResult {
    for import in &state.source.imports {
        if import.on_demand || import.member_span.is_some() {
            continue;
        }
        if let Some(class) = &import.class_name {
            state.imported.insert(class.clone());
        }
    }
    Ok(())
}

fn rename_classes(_: &KotlinAdapter, state: &mut KotlinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for class in &state.source.classes {
        let (Some(span), Some(new)) = (class.name_span, tree.new_class_name(&class.jvm_name)) else {
            continue;
        };
        if package_of(&new) != package_of(&class.jvm_name) {
            ctx.unsupported(
                DiagnosticAnchor::Declaration(class.decl_start),
                format!(
                    "{} moves to {}; moving Kotlin classes between packages is not supported",
                    to_source_name(&class.jvm_name),
                    to_source_name(&new)
                ),
            );
            continue;
        }
        ctx.replace(span, quote_if_needed(simple_name(&new)))?;
    }
    Ok(())
}

fn rename_members(adapter: &KotlinAdapter, state: &mut KotlinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    let resolver = adapter.resolver.as_ref();
    for class in &state.source.classes {
        let owner = class.jvm_name.as_str();
        for field in &class.fields {
            let Some(span) = field.name_span else {
                continue;
            };
            let anchor = DiagnosticAnchor::Declaration(field.decl_start);
            match property_decision(resolver, tree, owner, &field.name) {
                Ok(decision) => apply_decision(ctx, decision, span, anchor, &format!("property {}", field.name))?,
                Err(message) => ctx.unsupported(anchor, message),
            }
        }
        for method in &class.methods {
            let Some(span) = method.name_span else {
                continue;
            };
            if method.is_constructor {
                continue;
            }
            let decision = method_decision(resolver, tree, owner, &method.name, &method.desc);
            let what = format!("function {}{}", method.name, method.desc);
            apply_decision(ctx, decision, span, DiagnosticAnchor::Declaration(method.decl_start), &what)?;
        }
    }
    Ok(())
}

fn rename_references(adapter: &KotlinAdapter, state: &mut KotlinState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    let resolver = adapter.resolver.as_ref();
    let source = state.source;
    for site in &source.references {
        let Some(symbol) = resolver.resolve(site) else {
            continue;
        };
        let anchor = DiagnosticAnchor::Declaration(site.enclosing);
        match symbol {
            Symbol::Field { owner, name } => {
                if site.context == RefContext::Import {
                    continue;
                }
                note_member_use(state, site, symbol, name);
                match property_decision(resolver, tree, owner, name) {
                    Ok(decision) => apply_decision(ctx, decision, site.span, anchor, &format!("{}.{}", owner, name))?,
                    Err(message) => ctx.unsupported(anchor, message),
                }
            }
            Symbol::Method { owner, name, desc } => {
                if site.context == RefContext::Import {
                    continue;
                }
                note_member_use(state, site, symbol, name);
                let decision = method_decision(resolver, tree, owner, name, desc);
                if site.context == RefContext::Property {
                    rename_property_access(site, name, desc, decision, ctx)?;
                } else {
                    apply_decision(ctx, decision, site.span, anchor, &format!("{}.{}{}", owner, name, desc))?;
                }
            }
            Symbol::Constructor { owner, .. } => {
                if let Some(new) = tree.new_class_name(owner) {
                    ctx.replace(site.span, quote_if_needed(simple_name(&new)))?;
                }
            }
            Symbol::Class { name } => rename_class_reference(state, site, name, ctx)?,
            Symbol::Package { .. } => {}
        }
    }
    Ok(())
}

fn note_member_use(state: &mut KotlinState<'_>, site: &ReferenceSite, symbol: &Symbol, name: &str) {
    if site.qualifier.is_none() {
        state
            .member_usages
            .entry(name.to_string())
            .or_default()
            .insert(symbol.clone());
    }
}

/// `a.name` standing for a Java getter or setter call.
///
/// A getter renamed to a non-getter name becomes a call; a setter renamed to
/// a non-setter name cannot be expressed as an assignment and is reported.
fn rename_property_access(
    site: &ReferenceSite,
    name: &str,
    desc: &str,
    decision: Decision,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let anchor = DiagnosticAnchor::Declaration(site.enclosing);
    let new = match decision {
        Decision::Keep => return Ok(()),
        Decision::Ambiguous(candidates) => {
            ctx.ambiguous(anchor, format!("ambiguous rename of property access {}", name), candidates);
            return Ok(());
        }
        Decision::Rename(new) => new,
    };
    let accessor = Accessor {
        name: name.to_string(),
        desc: desc.to_string(),
        setter: !desc.starts_with("()") && desc.ends_with(")V"),
        boolean_style: false,
    };
    match accessor.property_name(&new) {
        Some(property) => ctx.replace(site.span, quote_if_needed(&property)),
        None if !accessor.setter => ctx.replace(site.span, format!("{}()", quote_if_needed(&new))),
        None => {
            ctx.unsupported(
                anchor,
                format!("assignment through {} cannot follow its rename to {}", name, new),
            );
            Ok(())
        }
    }
}

fn rename_class_reference(
    state: &KotlinState<'_>,
    site: &ReferenceSite,
    old: &str,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let Some(new) = ctx.tree().new_class_name(old) else {
        return Ok(());
    };
    if site.context == RefContext::Import {
        let full = match &site.qualifier {
            Some(q) => Span::new(q.span.start, site.span.end),
            None => site.span,
        };
        return ctx.replace(full, quote_path(&to_source_name(&new)));
    }

    let new_package = package_of(&new);
    match &site.qualifier {
        Some(qualifier) if matches!(qualifier.target, Some(Symbol::Package { .. })) => {
            if new_package.is_empty() {
                ctx.replace(Span::new(qualifier.span.start, site.span.start), "")?;
            } else {
                ctx.replace(qualifier.span, quote_path(&to_source_name(new_package)))?;
            }
        }
        Some(_) => {}
        None => {
            let needs_qualifier = site.context == RefContext::Code
                && new_package != package_of(old)
                && !new_package.is_empty()
                && !old.contains('$')
                && !state.imported.contains(old)
                && !state.source.declares(old);
            if needs_qualifier {
                return ctx.replace(site.span, quote_path(&to_source_name(&new)));
            }
        }
    }
    ctx.replace(site.span, quote_if_needed(simple_name(&new)))
}

fn rename_member_imports(
    adapter: &KotlinAdapter,
    state: &mut KotlinState<'_>,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let tree = ctx.tree();
    let resolver = adapter.resolver.as_ref();
    let source = state.source;
    for import in &source.imports {
        let (false, Some(owner), Some(member_span)) = (import.on_demand, &import.class_name, import.member_span) else {
            continue;
        };
        let Some(member) = ctx.slice(member_span) else {
            continue;
        };
        let member = member.trim_matches('`');

        let mut symbols: BTreeSet<Symbol> = state
            .member_usages
            .get(member)
            .map(|used| {
                used.iter()
                    .filter(|s| matches!(s, Symbol::Field { owner: o, .. } | Symbol::Method { owner: o, .. } if o == owner))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if symbols.is_empty() {
            symbols = declared_members(resolver, tree, owner, member);
        }

        let mut candidates = Candidates::new();
        for symbol in &symbols {
            let (label, decision) = match symbol {
                Symbol::Field { owner, name } => match property_decision(resolver, tree, owner, name) {
                    Ok(decision) => (format!("property {}.{}", owner, name), decision),
                    Err(_) => continue,
                },
                Symbol::Method { owner, name, desc } => (
                    format!("function {}.{}{}", owner, name, desc),
                    method_decision(resolver, tree, owner, name, desc),
                ),
                _ => continue,
            };
            match decision {
                Decision::Keep => candidates.push(label, member),
                Decision::Rename(new) => candidates.push(label, new),
                Decision::Ambiguous(list) => {
                    for candidate in list {
                        candidates.push(candidate.label, candidate.new_name);
                    }
                }
            }
        }
        let what = format!("import {}", import.path);
        apply_decision(
            ctx,
            candidates.decide(member),
            member_span,
            DiagnosticAnchor::Declaration(import.span.start),
            &what,
        )?;
    }
    Ok(())
}
