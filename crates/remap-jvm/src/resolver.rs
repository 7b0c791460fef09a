//! Reference resolution over the source model.
//!
//! Adapters never inspect [`SourceIndex`] directly for cross-file questions;
//! they go through [`ReferenceResolver`], which a host can back with its own
//! index. [`SymbolTable`] is the built-in implementation.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::model::{ClassDecl, JavaSource, MethodDecl, ReferenceSite, SourceIndex, Symbol};

pub trait ReferenceResolver: Send + Sync {
    /// The model of one source file, if the host has it.
    fn source(&self, path: &str) -> Option<&JavaSource>;

    /// The symbol a reference denotes.
    fn resolve<'r>(&self, site: &'r ReferenceSite) -> Option<&'r Symbol> {
        site.target.as_ref()
    }

    /// Every reference to `symbol`, with the path of its file.
    fn find_usages(&self, symbol: &Symbol) -> Vec<(&str, &ReferenceSite)>;

    fn class(&self, name: &str) -> Option<&ClassDecl>;

    /// Owners of the topmost declarations that `owner.name desc` overrides.
    /// Empty when the method overrides nothing.
    fn deepest_super_methods(&self, owner: &str, name: &str, desc: &str) -> Vec<String>;

    /// Methods named `name` declared by `owner` or any supertype.
    fn methods_by_name(&self, owner: &str, name: &str) -> Vec<(String, &MethodDecl)>;

    /// Whether the field or method a symbol names is static.
    fn is_static(&self, symbol: &Symbol) -> bool {
        match symbol {
            Symbol::Field { owner, name } => self
                .class(owner)
                .and_then(|c| c.field(name))
                .is_some_and(|f| f.is_static),
            Symbol::Method { owner, name, desc } => self
                .class(owner)
                .and_then(|c| c.method(name, desc))
                .is_some_and(|m| m.is_static),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ClassLocation {
    Source(usize),
    Library(usize),
}

/// [`ReferenceResolver`] over a [`SourceIndex`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    index: SourceIndex,
    paths: Vec<String>,
    classes: HashMap<String, (ClassLocation, usize)>,
}

impl SymbolTable {
    pub fn new(index: SourceIndex) -> Self {
        let paths: Vec<String> = index.files.keys().cloned().collect();
        let mut classes = HashMap::new();
        for (file_idx, source) in index.files.values().enumerate() {
            for (class_idx, class) in source.classes.iter().enumerate() {
                classes.insert(
                    class.jvm_name.clone(),
                    (ClassLocation::Source(file_idx), class_idx),
                );
            }
        }
        for (class_idx, class) in index.libraries.iter().enumerate() {
            classes
                .entry(class.jvm_name.clone())
                .or_insert((ClassLocation::Library(class_idx), class_idx));
        }
        debug!(files = paths.len(), classes = classes.len(), "built symbol table");
        SymbolTable {
            index,
            paths,
            classes,
        }
    }

    pub fn index(&self) -> &SourceIndex {
        &self.index
    }

    /// Origins of `name desc` strictly above `class_name`.
    ///
    /// `path` holds the supertypes on the current walk and guards against
    /// cycles. `memo` caches each supertype's result so a shared ancestor
    /// reached through a second branch covers that branch too.
    fn deepest_above(
        &self,
        class: &ClassDecl,
        name: &str,
        desc: &str,
        path: &mut BTreeSet<String>,
        memo: &mut HashMap<String, Vec<String>>,
    ) -> Vec<String> {
        let mut out = Vec::new();
        for sup in &class.supertypes {
            if path.contains(sup) {
                continue;
            }
            if let Some(found) = memo.get(sup) {
                out.extend(found.iter().cloned());
                continue;
            }
            let Some(decl) = self.class(sup) else {
                continue;
            };
            path.insert(sup.clone());
            let deeper = self.deepest_above(decl, name, desc, path, memo);
            path.remove(sup);
            let declares = decl.method(name, desc).is_some_and(MethodDecl::can_override);
            let found = if deeper.is_empty() && declares {
                vec![sup.clone()]
            } else {
                deeper
            };
            out.extend(found.iter().cloned());
            memo.insert(sup.clone(), found);
        }
        out
    }
}

impl ReferenceResolver for SymbolTable {
    fn source(&self, path: &str) -> Option<&JavaSource> {
        self.index.files.get(path)
    }

    fn find_usages(&self, symbol: &Symbol) -> Vec<(&str, &ReferenceSite)> {
        self.index
            .files
            .iter()
            .flat_map(|(path, source)| {
                source
                    .references
                    .iter()
                    .filter(move |site| site.target.as_ref() == Some(symbol))
                    .map(move |site| (path.as_str(), site))
            })
            .collect()
    }

    fn class(&self, name: &str) -> Option<&ClassDecl> {
        let (location, class_idx) = self.classes.get(name)?;
        match location {
            ClassLocation::Source(file_idx) => {
                let path = self.paths.get(*file_idx)?;
                self.index.files.get(path)?.classes.get(*class_idx)
            }
            ClassLocation::Library(idx) => self.index.libraries.get(*idx),
        }
    }

    fn deepest_super_methods(&self, owner: &str, name: &str, desc: &str) -> Vec<String> {
        let Some(class) = self.class(owner) else {
            return Vec::new();
        };
        if class.method(name, desc).is_some_and(|m| !m.can_override()) {
            return Vec::new();
        }
        let mut path = BTreeSet::from([owner.to_string()]);
        let mut out = self.deepest_above(class, name, desc, &mut path, &mut HashMap::new());
        out.sort();
        out.dedup();
        out
    }

    fn methods_by_name(&self, owner: &str, name: &str) -> Vec<(String, &MethodDecl)> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = vec![owner.to_string()];
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(class) = self.class(&current) else {
                continue;
            };
            for method in class.methods.iter().filter(|m| m.name == name) {
                out.push((current.clone(), method));
            }
            queue.extend(class.supertypes.iter().cloned());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodDecl, RefContext};
    use remap_core::patch::Span;

    fn class(name: &str, supers: &[&str], methods: &[(&str, &str)]) -> ClassDecl {
        ClassDecl {
            jvm_name: name.to_string(),
            name_span: None,
            decl_start: 0,
            supertypes: supers.iter().map(|s| s.to_string()).collect(),
            is_record: false,
            fields: Vec::new(),
            methods: methods
                .iter()
                .map(|(n, d)| MethodDecl {
                    name: n.to_string(),
                    desc: d.to_string(),
                    name_span: None,
                    decl_start: 0,
                    is_constructor: false,
                    is_static: false,
                    is_private: false,
                })
                .collect(),
            record_components: Vec::new(),
        }
    }

    fn table() -> SymbolTable {
        let mut index = SourceIndex::default();
        index.libraries = vec![
            class("a/Base", &[], &[("run", "()V")]),
            class("a/Mid", &["a/Base"], &[("run", "()V")]),
            class("a/Iface", &[], &[("run", "()V")]),
        ];
        let source = JavaSource {
            classes: vec![class("a/Impl", &["a/Mid", "a/Iface"], &[("run", "()V"), ("own", "()V")])],
            references: vec![ReferenceSite {
                span: Span::new(0, 3),
                target: Some(Symbol::method("a/Impl", "run", "()V")),
                qualifier: None,
                context: RefContext::Code,
                enclosing: 0,
            }],
            ..JavaSource::default()
        };
        index.files.insert("src/a/Impl.java".to_string(), source);
        SymbolTable::new(index)
    }

    #[test]
    fn deepest_supers_skip_intermediate_overrides() {
        let table = table();
        assert_eq!(
            table.deepest_super_methods("a/Impl", "run", "()V"),
            vec!["a/Base".to_string(), "a/Iface".to_string()]
        );
        assert!(table.deepest_super_methods("a/Impl", "own", "()V").is_empty());
    }

    #[test]
    fn shared_ancestor_in_a_diamond_is_the_only_origin() {
        let mut index = SourceIndex::default();
        index.libraries = vec![
            class("a/I", &[], &[("m", "()V")]),
            class("a/L", &["a/I"], &[("m", "()V")]),
            class("a/R", &["a/I"], &[("m", "()V")]),
            class("a/C", &["a/L", "a/R"], &[("m", "()V")]),
        ];
        let table = SymbolTable::new(index);
        assert_eq!(table.deepest_super_methods("a/C", "m", "()V"), vec!["a/I".to_string()]);
        assert_eq!(table.deepest_super_methods("a/R", "m", "()V"), vec!["a/I".to_string()]);
    }

    #[test]
    fn diamond_with_one_declaring_branch_keeps_that_branch() {
        let mut index = SourceIndex::default();
        index.libraries = vec![
            class("a/I", &[], &[]),
            class("a/L", &["a/I"], &[("m", "()V")]),
            class("a/R", &["a/I"], &[]),
            class("a/C", &["a/L", "a/R"], &[("m", "()V")]),
        ];
        let table = SymbolTable::new(index);
        assert_eq!(table.deepest_super_methods("a/C", "m", "()V"), vec!["a/L".to_string()]);
    }

    #[test]
    fn methods_by_name_walks_supertypes() {
        let table = table();
        let owners: BTreeSet<String> = table
            .methods_by_name("a/Impl", "run")
            .into_iter()
            .map(|(o, _)| o)
            .collect();
        assert_eq!(owners.len(), 4);
    }

    #[test]
    fn usages_are_found_by_symbol() {
        let table = table();
        let usages = table.find_usages(&Symbol::method("a/Impl", "run", "()V"));
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].0, "src/a/Impl.java");
    }
}
