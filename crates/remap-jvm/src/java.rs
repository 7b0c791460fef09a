//! Java source adapter.
//!
//! Rewrites declarations and references of a `.java` file from the host's
//! [`JavaSource`] model: package statement, class and member names,
//! qualified and simple references, imports and static imports, and finally
//! the file location.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use remap_core::ambiguity::{Candidates, Decision};
use remap_core::diagnostic::{Candidate, DiagnosticAnchor};
use remap_core::mapping::tree::{Fact, MappingTree};
use remap_core::mapping::{package_of, simple_name, to_source_name};
use remap_core::patch::Span;
use remap_core::stage::{run_pipeline, Adapter, Stage, StageContext, StageResult};
use remap_core::text::line_end;

use crate::model::{ClassDecl, JavaSource, RefContext, ReferenceSite, Symbol};
use crate::resolver::ReferenceResolver;
use crate::target::SPECIAL_METHODS;

pub struct JavaAdapter {
    resolver: Arc<dyn ReferenceResolver>,
}

impl JavaAdapter {
    pub fn new(resolver: Arc<dyn ReferenceResolver>) -> Self {
        JavaAdapter { resolver }
    }

    /// Decide the new name of `owner.name desc`.
    ///
    /// Every topmost declaration the method overrides proposes a name; a
    /// method overriding nothing speaks for itself.
    pub fn method_decision(&self, tree: &MappingTree, owner: &str, name: &str, desc: &str) -> Decision {
        method_decision(self.resolver.as_ref(), tree, owner, name, desc)
    }
}

pub(crate) fn method_decision(
    resolver: &dyn ReferenceResolver,
    tree: &MappingTree,
    owner: &str,
    name: &str,
    desc: &str,
) -> Decision {
    if SPECIAL_METHODS.contains(&name) {
        return Decision::Keep;
    }
    let mut origins = resolver.deepest_super_methods(owner, name, desc);
    if origins.is_empty() {
        origins.push(owner.to_string());
    }
    let mut candidates = Candidates::new();
    for origin in &origins {
        let resolution = tree.method_resolution(origin, name, desc);
        candidates.push(format!("{}#{}{}", origin, name, desc), resolution.name_or(name));
    }
    candidates.decide(name)
}

/// Per-file state shared by the stages.
struct JavaState<'s> {
    source: &'s JavaSource,
    /// Old internal names of explicitly imported classes.
    imported: BTreeSet<String>,
    /// Simple names visible in the file after the rewrite, to old internal names.
    visible: HashMap<String, String>,
    /// Top-level classes as (old, new) internal names.
    top_level: Vec<(String, String)>,
    /// Slash-separated package after the rewrite; `None` when undecidable.
    new_package: Option<String>,
    /// Unqualified static member uses, by member name.
    static_usages: BTreeMap<String, BTreeSet<Symbol>>,
    import_offset: u64,
    added_imports: BTreeSet<String>,
}

impl<'s> JavaState<'s> {
    fn new(source: &'s JavaSource) -> Self {
        JavaState {
            source,
            imported: BTreeSet::new(),
            visible: HashMap::new(),
            top_level: Vec::new(),
            new_package: None,
            static_usages: BTreeMap::new(),
            import_offset: 0,
            added_imports: BTreeSet::new(),
        }
    }

    fn old_package(&self) -> String {
        self.source
            .package
            .as_ref()
            .map(|p| p.name.replace('.', "/"))
            .unwrap_or_default()
    }

    fn target_package(&self) -> String {
        self.new_package.clone().unwrap_or_else(|| self.old_package())
    }
}

impl Adapter for JavaAdapter {
    fn name(&self) -> &'static str {
        "java"
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
            debug!(file = %artifact.path, "no source model, skipping");
            return;
        };
        let stages: [Stage<JavaAdapter, JavaState<'_>>; 7] = [
            Stage { name: "collect_imports", run: collect_imports },
            Stage { name: "rename_classes", run: rename_classes },
            Stage { name: "rename_package", run: rename_package },
            Stage { name: "rename_members", run: rename_members },
            Stage { name: "rename_references", run: rename_references },
            Stage { name: "rename_static_imports", run: rename_static_imports },
            Stage { name: "relocate_file", run: relocate_file },
        ];
        run_pipeline(self, &mut JavaState::new(source), &stages, ctx);
    }
}

// ============================================================================
// Stages
// ============================================================================

fn collect_imports(_: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for import in &state.source.imports {
        if import.is_static || import.on_demand {
            continue;
        }
        if let Some(class) = &import.class_name {
            state.imported.insert(class.clone());
            let new = tree.new_class_name(class).unwrap_or_else(|| class.clone());
            state.visible.insert(simple_name(&new).to_string(), class.clone());
        }
    }
    let text = ctx.text();
    state.import_offset = match (state.source.imports.last(), &state.source.package) {
        (Some(last), _) => line_end(text, last.span.end),
        (None, Some(package)) => line_end(text, package.span.end),
        (None, None) => 0,
    };
    Ok(())
}

fn rename_classes(_: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for class in &state.source.classes {
        let new = tree
            .new_class_name(&class.jvm_name)
            .unwrap_or_else(|| class.jvm_name.clone());
        if let Some(span) = class.name_span {
            ctx.replace(span, simple_name(&new))?;
        }
        state
            .visible
            .insert(simple_name(&new).to_string(), class.jvm_name.clone());
        if !class.is_nested() {
            state.top_level.push((class.jvm_name.clone(), new));
        }
    }
    Ok(())
}

fn rename_package(_: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let packages: BTreeSet<&str> = state.top_level.iter().map(|(_, new)| package_of(new)).collect();
    let anchor = state
        .source
        .package
        .as_ref()
        .map(|p| DiagnosticAnchor::Declaration(p.span.start))
        .unwrap_or(DiagnosticAnchor::File);

    if packages.len() > 1 {
        let candidates = state
            .top_level
            .iter()
            .map(|(old, new)| Candidate {
                label: old.clone(),
                new_name: to_source_name(package_of(new)),
            })
            .collect();
        ctx.ambiguous(anchor, "classes in this file move to different packages", candidates);
        return Ok(());
    }
    let Some(new_package) = packages.into_iter().next() else {
        return Ok(());
    };

    match &state.source.package {
        Some(_) if new_package.is_empty() => {
            ctx.unsupported(anchor, "moving classes to the default package is not supported");
            return Ok(());
        }
        Some(package) => ctx.replace(package.span, to_source_name(new_package))?,
        None if !new_package.is_empty() => {
            ctx.insert(0, format!("package {};\n\n", to_source_name(new_package)));
        }
        None => {}
    }
    state.new_package = Some(new_package.to_string());
    Ok(())
}

fn rename_members(adapter: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    for class in &state.source.classes {
        let owner = class.jvm_name.as_str();
        for field in &class.fields {
            if let (Some(span), Some(new)) = (field.name_span, tree.new_field_name(owner, &field.name)) {
                ctx.replace(span, new)?;
            }
        }

        for method in &class.methods {
            let Some(span) = method.name_span else {
                continue;
            };
            if method.is_constructor {
                if let Some(new) = tree.new_class_name(owner) {
                    ctx.replace(span, simple_name(&new))?;
                }
                continue;
            }
            let decision = adapter.method_decision(tree, owner, &method.name, &method.desc);
            let what = format!("{}{}", method.name, method.desc);
            ctx.apply_decision(decision, span, DiagnosticAnchor::Declaration(method.decl_start), &what)?;
        }

        if class.is_record {
            rename_record_components(adapter, class, ctx)?;
        }
    }
    Ok(())
}

/// A record component is a field plus an accessor that may implement an
/// interface method, so both sides propose names.
fn rename_record_components(adapter: &JavaAdapter, class: &ClassDecl, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    let owner = class.jvm_name.as_str();
    for component in &class.record_components {
        let name = component.name.as_str();
        let accessor = format!("(){}", component.desc);
        let mut candidates = Candidates::new();
        for origin in adapter.resolver.deepest_super_methods(owner, name, &accessor) {
            let resolution = tree.method_resolution(&origin, name, &accessor);
            candidates.push(format!("{}#{}{}", origin, name, accessor), resolution.name_or(name));
        }
        let field = tree.field_resolution(owner, name);
        if field.is_resolved() || candidates.is_empty() {
            candidates.push(format!("{}.{}", owner, name), field.name_or(name));
        }

        match candidates.decide(name) {
            Decision::Keep => {}
            Decision::Rename(new) => {
                if let Some(span) = component.name_span {
                    ctx.replace(span, new.clone())?;
                }
                ctx.rerun(Fact::field(owner, name, new.clone()));
                ctx.rerun(Fact::method(owner, name, accessor, new));
            }
            Decision::Ambiguous(list) => {
                ctx.ambiguous(
                    DiagnosticAnchor::Declaration(class.decl_start),
                    format!("ambiguous rename of record component {}", name),
                    list,
                );
            }
        }
    }
    Ok(())
}

fn rename_references(adapter: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    let source = state.source;
    for site in &source.references {
        let Some(symbol) = adapter.resolver.resolve(site) else {
            continue;
        };
        match symbol {
            Symbol::Field { owner, name } => {
                if site.context == RefContext::Import {
                    continue;
                }
                note_static_use(adapter, state, site, symbol, name);
                if let Some(new) = tree.new_field_name(owner, name) {
                    ctx.replace(site.span, new)?;
                }
            }
            Symbol::Method { owner, name, desc } => {
                if site.context == RefContext::Import {
                    continue;
                }
                note_static_use(adapter, state, site, symbol, name);
                let decision = adapter.method_decision(tree, owner, name, desc);
                let what = format!("{}.{}{}", owner, name, desc);
                ctx.apply_decision(decision, site.span, DiagnosticAnchor::Declaration(site.enclosing), &what)?;
            }
            Symbol::Constructor { owner, .. } => {
                if let Some(new) = tree.new_class_name(owner) {
                    ctx.replace(site.span, simple_name(&new))?;
                }
            }
            Symbol::Class { name } => rename_class_reference(state, site, name, ctx)?,
            Symbol::Package { .. } => {}
        }
    }
    Ok(())
}

fn note_static_use(adapter: &JavaAdapter, state: &mut JavaState<'_>, site: &ReferenceSite, symbol: &Symbol, name: &str) {
    if site.qualifier.is_none() && adapter.resolver.is_static(symbol) {
        state
            .static_usages
            .entry(name.to_string())
            .or_default()
            .insert(symbol.clone());
    }
}

fn rename_class_reference(
    state: &mut JavaState<'_>,
    site: &ReferenceSite,
    old: &str,
    ctx: &mut StageContext<'_>,
) -> StageResult {
    let Some(new) = ctx.tree().new_class_name(old) else {
        return Ok(());
    };
    let full_span = |site: &ReferenceSite| match &site.qualifier {
        Some(q) => Span::new(q.span.start, site.span.end),
        None => site.span,
    };

    if site.context == RefContext::Import {
        return ctx.replace(full_span(site), to_source_name(&new));
    }

    let new_simple = simple_name(&new);
    let collides = state
        .visible
        .get(new_simple)
        .is_some_and(|visible| visible != old);
    if collides {
        return ctx.replace(full_span(site), to_source_name(&new));
    }

    match &site.qualifier {
        Some(qualifier) if matches!(qualifier.target, Some(Symbol::Package { .. })) => {
            let new_package = package_of(&new);
            if new_package.is_empty() {
                ctx.replace(Span::new(qualifier.span.start, site.span.start), "")?;
            } else {
                ctx.replace(qualifier.span, to_source_name(new_package))?;
            }
        }
        Some(_) => {}
        None => {
            if site.context == RefContext::Code {
                add_import_if_needed(state, old, &new, ctx);
            }
        }
    }
    ctx.replace(site.span, new_simple)
}

/// A simple-name reference to a class that left the file's package needs an
/// import, unless the file declares or imports the class already.
fn add_import_if_needed(state: &mut JavaState<'_>, old: &str, new: &str, ctx: &mut StageContext<'_>) {
    let new_package = package_of(new);
    if state.source.declares(old)
        || state.imported.contains(old)
        || old.contains('$')
        || new_package == package_of(old)
        || new_package.is_empty()
        || new_package == state.target_package()
    {
        return;
    }
    if !state.added_imports.insert(new.to_string()) {
        return;
    }
    let lead = if state.source.imports.is_empty() && state.source.package.is_some() && state.added_imports.len() == 1 {
        "\n"
    } else {
        ""
    };
    state.visible.insert(simple_name(new).to_string(), old.to_string());
    ctx.insert(state.import_offset, format!("{}import {};\n", lead, to_source_name(new)));
}

fn rename_static_imports(adapter: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let tree = ctx.tree();
    let source = state.source;
    for import in &source.imports {
        let (true, false, Some(owner), Some(member_span)) =
            (import.is_static, import.on_demand, &import.class_name, import.member_span)
        else {
            continue;
        };
        let Some(member) = ctx.slice(member_span) else {
            continue;
        };

        let mut symbols: BTreeSet<Symbol> = state
            .static_usages
            .get(member)
            .map(|used| {
                used.iter()
                    .filter(|s| matches!(s, Symbol::Field { owner: o, .. } | Symbol::Method { owner: o, .. } if o == owner))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if symbols.is_empty() {
            symbols = declared_members(adapter.resolver.as_ref(), tree, owner, member);
        }

        let what = format!("static import {}", import.path);
        ctx.apply_decision(
            member_candidates(tree, &symbols).decide(member),
            member_span,
            DiagnosticAnchor::Declaration(import.span.start),
            &what,
        )?;
    }
    Ok(())
}

/// The new name each imported member proposes.
pub(crate) fn member_candidates(tree: &MappingTree, symbols: &BTreeSet<Symbol>) -> Candidates {
    let mut candidates = Candidates::new();
    for symbol in symbols {
        match symbol {
            Symbol::Field { owner, name } => {
                let resolution = tree.field_resolution(owner, name);
                candidates.push(format!("field {}.{}", owner, name), resolution.name_or(name));
            }
            Symbol::Method { owner, name, desc } => {
                let resolution = tree.method_resolution(owner, name, desc);
                candidates.push(format!("method {}.{}{}", owner, name, desc), resolution.name_or(name));
            }
            _ => {}
        }
    }
    candidates
}

/// Every field and method named `member` on `owner`, from the resolver when
/// it knows the class and from the mappings otherwise.
pub(crate) fn declared_members(
    resolver: &dyn ReferenceResolver,
    tree: &MappingTree,
    owner: &str,
    member: &str,
) -> BTreeSet<Symbol> {
    let mut symbols = BTreeSet::new();
    match resolver.class(owner) {
        Some(class) => {
            if class.field(member).is_some() {
                symbols.insert(Symbol::field(owner, member));
            }
            for (method_owner, method) in resolver.methods_by_name(owner, member) {
                symbols.insert(Symbol::method(method_owner, member, method.desc.clone()));
            }
        }
        None => {
            if tree.has_field(owner, member) {
                symbols.insert(Symbol::field(owner, member));
            }
            for (desc, _) in tree.method_overloads(owner, member) {
                symbols.insert(Symbol::method(owner, member, desc));
            }
        }
    }
    symbols
}

fn relocate_file(_: &JavaAdapter, state: &mut JavaState<'_>, ctx: &mut StageContext<'_>) -> StageResult {
    let Some(new_package) = state.new_package.clone() else {
        return Ok(());
    };
    let artifact = ctx.artifact();
    let stem = artifact.file_name().trim_end_matches(".java");
    let primary = state
        .top_level
        .iter()
        .find(|(old, _)| simple_name(old) == stem)
        .or_else(|| state.top_level.first());
    let Some((_, new)) = primary else {
        return Ok(());
    };

    let dir = artifact
        .path
        .rfind('/')
        .map(|i| &artifact.path[..i])
        .unwrap_or("");
    let old_package = state.old_package();
    let root = if old_package.is_empty() {
        Some(dir)
    } else if dir == old_package {
        Some("")
    } else {
        dir.strip_suffix(&old_package).and_then(|r| r.strip_suffix('/'))
    };
    let Some(root) = root else {
        debug!(file = %artifact.path, package = %old_package, "file is not under its package directory, not moving");
        return Ok(());
    };

    let new_path = [root, new_package.as_str(), &format!("{}.java", simple_name(new))]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    ctx.relocate(new_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDecl, MethodDecl, PackageDecl, Qualifier, SourceIndex};
    use crate::resolver::SymbolTable;
    use remap_core::mapping::chain::MappingChain;
    use remap_core::mapping::table::{ClassEntry, FieldEntry, MappingTable, MethodEntry};
    use remap_core::mapping::tree::DeltaTree;
    use remap_core::stage::Artifact;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn span_of(text: &str, needle: &str, nth: usize) -> Span {
        let start = text.match_indices(needle).nth(nth).map(|(i, _)| i).unwrap() as u64;
        Span::new(start, start + needle.len() as u64)
    }

    fn tree() -> MappingTree {
        let mut t = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut widget = ClassEntry::new(names(&["a/Widget", "b/Gadget"]));
        widget.fields.push(FieldEntry {
            names: names(&["size", "width"]),
            desc: Some("I".to_string()),
        });
        widget.methods.push(MethodEntry {
            names: names(&["draw", "render"]),
            desc: "()V".to_string(),
        });
        t.insert_class(widget);
        let chain = MappingChain::new().with_hop(&t, "old", "new").unwrap();
        MappingTree::new(Arc::new(chain))
    }

    const WIDGET: &str = "package a;\n\npublic class Widget {\n    int size;\n    Widget() {}\n    void draw() { draw(); }\n}\n";

    fn widget_source() -> JavaSource {
        let t = WIDGET;
        JavaSource {
            package: Some(PackageDecl {
                name: "a".to_string(),
                span: Span::new(8, 9),
            }),
            classes: vec![ClassDecl {
                jvm_name: "a/Widget".to_string(),
                name_span: Some(span_of(t, "Widget", 0)),
                decl_start: span_of(t, "public", 0).start,
                supertypes: vec![],
                is_record: false,
                fields: vec![FieldDecl {
                    name: "size".to_string(),
                    desc: "I".to_string(),
                    name_span: Some(span_of(t, "size", 0)),
                    decl_start: span_of(t, "int", 0).start,
                    is_static: false,
                    is_private: false,
                }],
                methods: vec![
                    MethodDecl {
                        name: "<init>".to_string(),
                        desc: "()V".to_string(),
                        name_span: Some(span_of(t, "Widget", 1)),
                        decl_start: span_of(t, "Widget", 1).start,
                        is_constructor: true,
                        is_static: false,
                        is_private: false,
                    },
                    MethodDecl {
                        name: "draw".to_string(),
                        desc: "()V".to_string(),
                        name_span: Some(span_of(t, "draw", 0)),
                        decl_start: span_of(t, "void", 0).start,
                        is_constructor: false,
                        is_static: false,
                        is_private: false,
                    },
                ],
                record_components: vec![],
            }],
            references: vec![ReferenceSite {
                span: span_of(t, "draw", 1),
                target: Some(Symbol::method("a/Widget", "draw", "()V")),
                qualifier: None,
                context: RefContext::Code,
                enclosing: span_of(t, "void", 0).start,
            }],
            ..JavaSource::default()
        }
    }

    fn run(path: &str, text: &str, index: SourceIndex) -> (String, Option<String>) {
        let adapter = JavaAdapter::new(Arc::new(SymbolTable::new(index)));
        let artifact = Artifact::new(path, text);
        let tree = tree();
        let delta = DeltaTree::new();
        let mut ctx = StageContext::new(&artifact, &tree, &delta);
        ctx.run_adapter(&adapter);
        let outcome = ctx.finish();
        (outcome.patch.apply(text).unwrap(), outcome.patch.relocate_to)
    }

    #[test]
    fn declarations_package_and_location_follow_the_class() {
        let mut index = SourceIndex::default();
        index.files.insert("src/a/Widget.java".to_string(), widget_source());
        let (out, moved) = run("src/a/Widget.java", WIDGET, index);
        assert_eq!(
            out,
            "package b;\n\npublic class Gadget {\n    int width;\n    Gadget() {}\n    void render() { render(); }\n}\n"
        );
        assert_eq!(moved.as_deref(), Some("src/b/Gadget.java"));
    }

    #[test]
    fn unqualified_reference_gets_an_import() {
        let text = "package c;\n\nclass User {\n    Widget w;\n}\n";
        let source = JavaSource {
            package: Some(PackageDecl {
                name: "c".to_string(),
                span: Span::new(8, 9),
            }),
            classes: vec![ClassDecl {
                jvm_name: "c/User".to_string(),
                name_span: Some(span_of(text, "User", 0)),
                decl_start: span_of(text, "class", 0).start,
                supertypes: vec![],
                is_record: false,
                fields: vec![],
                methods: vec![],
                record_components: vec![],
            }],
            references: vec![ReferenceSite {
                span: span_of(text, "Widget", 0),
                target: Some(Symbol::Class {
                    name: "a/Widget".to_string(),
                }),
                qualifier: None,
                context: RefContext::Code,
                enclosing: 0,
            }],
            ..JavaSource::default()
        };
        let mut index = SourceIndex::default();
        index.files.insert("c/User.java".to_string(), source);
        let (out, moved) = run("c/User.java", text, index);
        assert_eq!(out, "package c;\n\nimport b.Gadget;\n\nclass User {\n    Gadget w;\n}\n");
        assert_eq!(moved, None);
    }

    #[test]
    fn qualified_reference_rewrites_package_qualifier() {
        let text = "class User { a.Widget w; }\n";
        let qualifier = text.find("a.Widget").unwrap() as u64;
        let source = JavaSource {
            references: vec![ReferenceSite {
                span: span_of(text, "Widget", 0),
                target: Some(Symbol::Class {
                    name: "a/Widget".to_string(),
                }),
                qualifier: Some(Qualifier {
                    span: Span::new(qualifier, qualifier + 1),
                    target: Some(Symbol::Package { name: "a".to_string() }),
                }),
                context: RefContext::Code,
                enclosing: 0,
            }],
            ..JavaSource::default()
        };
        let mut index = SourceIndex::default();
        index.files.insert("User.java".to_string(), source);
        let (out, _) = run("User.java", text, index);
        assert_eq!(out, "class User { b.Gadget w; }\n");
    }

    #[test]
    fn override_through_a_diamond_follows_the_shared_root() {
        let plain = |name: &str, supers: &[&str]| ClassDecl {
            jvm_name: name.to_string(),
            name_span: None,
            decl_start: 0,
            supertypes: names(supers),
            is_record: false,
            fields: vec![],
            methods: vec![MethodDecl {
                name: "m".to_string(),
                desc: "()V".to_string(),
                name_span: None,
                decl_start: 0,
                is_constructor: false,
                is_static: false,
                is_private: false,
            }],
            record_components: vec![],
        };
        let mut index = SourceIndex::default();
        index.libraries = vec![plain("lib/I", &[])];
        index.files.insert(
            "a/Sides.java".to_string(),
            JavaSource {
                classes: vec![
                    plain("a/L", &["lib/I"]),
                    plain("a/R", &["lib/I"]),
                    plain("a/C", &["a/L", "a/R"]),
                ],
                ..JavaSource::default()
            },
        );

        let mut t = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut iface = ClassEntry::new(names(&["lib/I", "lib/I"]));
        iface.methods.push(MethodEntry {
            names: names(&["m", "perform"]),
            desc: "()V".to_string(),
        });
        t.insert_class(iface);
        let tree = MappingTree::new(Arc::new(MappingChain::new().with_hop(&t, "old", "new").unwrap()));

        let adapter = JavaAdapter::new(Arc::new(SymbolTable::new(index)));
        assert_eq!(
            adapter.method_decision(&tree, "a/C", "m", "()V"),
            Decision::Rename("perform".to_string())
        );
    }

    #[test]
    fn file_without_model_is_untouched() {
        let (out, moved) = run("Other.java", WIDGET, SourceIndex::default());
        assert_eq!(out, WIDGET);
        assert_eq!(moved, None);
    }
}
