//! Multi-round runs through the coordinator: facts synthesized in one round
//! rename declarations and references in the next.

use std::collections::BTreeMap;
use std::sync::Arc;

use remap_core::artifact::{ArtifactStore, MemoryArtifactStore};
use remap_core::coordinator::{Coordinator, RunOptions};
use remap_core::mapping::chain::MappingChain;
use remap_core::mapping::table::{ClassEntry, FieldEntry, MappingTable, MethodEntry};
use remap_core::patch::Span;
use remap_jvm::model::{
    AnnotatedElement, AnnotationDecl, AnnotationValue, ClassDecl, FieldDecl, JavaSource, MethodDecl, PackageDecl,
    RecordComponent, RefContext, ReferenceSite, SourceIndex, Symbol,
};
use remap_jvm::{default_adapters, SymbolTable};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn span_of(text: &str, needle: &str) -> Span {
    let start = text.find(needle).unwrap() as u64;
    Span::new(start, start + needle.len() as u64)
}

/// Span of the first `len` bytes of `needle`.
fn prefix_of(text: &str, needle: &str, len: u64) -> Span {
    let start = span_of(text, needle).start;
    Span::new(start, start + len)
}

fn class(name: &str) -> ClassDecl {
    ClassDecl {
        jvm_name: name.to_string(),
        name_span: None,
        decl_start: 0,
        supertypes: vec![],
        is_record: false,
        fields: vec![],
        methods: vec![],
        record_components: vec![],
    }
}

fn method(name: &str, desc: &str) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        desc: desc.to_string(),
        name_span: None,
        decl_start: 0,
        is_constructor: false,
        is_static: false,
        is_private: false,
    }
}

fn coordinator(index: SourceIndex) -> Coordinator {
    Coordinator::new(default_adapters(Arc::new(SymbolTable::new(index)))).with_options(RunOptions {
        max_rounds: 5,
        parallel: false,
    })
}

mod record_accessor {
    use super::*;

    const POINT: &str = "package a;\n\nrecord Point(int x) implements Coord {\n    int twice() { return x * 2; }\n}\n";

    fn index() -> SourceIndex {
        let mut point = class("a/Point");
        point.name_span = Some(span_of(POINT, "Point"));
        point.decl_start = span_of(POINT, "record").start;
        point.is_record = true;
        point.supertypes = names(&["lib/Coord"]);
        point.methods.push(method("twice", "()I"));
        point.record_components.push(RecordComponent {
            name: "x".to_string(),
            desc: "I".to_string(),
            name_span: Some(prefix_of(POINT, "x)", 1)),
            decl_start: span_of(POINT, "int x").start,
        });

        let mut coord = class("lib/Coord");
        coord.methods.push(method("x", "()I"));

        let source = JavaSource {
            package: Some(PackageDecl {
                name: "a".to_string(),
                span: Span::new(8, 9),
            }),
            classes: vec![point],
            references: vec![ReferenceSite {
                span: prefix_of(POINT, "x *", 1),
                target: Some(Symbol::field("a/Point", "x")),
                qualifier: None,
                context: RefContext::Code,
                enclosing: span_of(POINT, "int twice").start,
            }],
            ..JavaSource::default()
        };
        SourceIndex {
            files: BTreeMap::from([("src/a/Point.java".to_string(), source)]),
            libraries: vec![coord],
        }
    }

    fn chain() -> Arc<MappingChain> {
        let mut table = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut coord = ClassEntry::new(names(&["lib/Coord", "lib/Coord"]));
        coord.methods.push(MethodEntry {
            names: names(&["x", "horizontal"]),
            desc: "()I".to_string(),
        });
        table.insert_class(coord);
        Arc::new(MappingChain::new().with_hop(&table, "old", "new").unwrap())
    }

    #[test]
    fn accessor_rename_renames_the_field_in_the_next_round() {
        let store = MemoryArtifactStore::new().with("src/a/Point.java", POINT);
        let plan = coordinator(index()).resolve(&store, chain()).unwrap();

        assert_eq!(plan.rounds, 2);
        assert!(plan.converged);
        assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
        assert_eq!(plan.synthesized.len(), 2);

        // Only the last round's edits survive: one per site, no duplicates.
        assert_eq!(plan.patches.len(), 1);
        assert_eq!(plan.patches[0].edits.len(), 2);
        assert_eq!(
            plan.patches[0].apply(POINT).unwrap(),
            "package a;\n\nrecord Point(int horizontal) implements Coord {\n    int twice() { return horizontal * 2; }\n}\n"
        );
    }

    #[test]
    fn single_round_limit_reports_non_convergence() {
        let store = MemoryArtifactStore::new().with("src/a/Point.java", POINT);
        let plan = coordinator(index())
            .with_options(RunOptions {
                max_rounds: 1,
                parallel: false,
            })
            .resolve(&store, chain())
            .unwrap();

        assert!(!plan.converged);
        assert_eq!(plan.diagnostics.len(), 1);
        assert!(plan.diagnostics[0].file.is_none());
        // The field reference is left for a round that never ran.
        assert_eq!(plan.patches[0].edits.len(), 1);
    }

    const CALLER: &str = "package a;\n\nclass Caller {\n    int read(Point p) { return p.x(); }\n}\n";

    /// `Point` implements nothing; only its field is mapped, and `Caller`
    /// sorts first and calls the accessor.
    fn caller_index() -> SourceIndex {
        let mut index = index();
        let point = &mut index.files.get_mut("src/a/Point.java").unwrap().classes[0];
        point.supertypes.clear();

        let mut caller = class("a/Caller");
        caller.name_span = Some(span_of(CALLER, "Caller"));
        caller.decl_start = span_of(CALLER, "class").start;
        caller.methods.push(method("read", "(La/Point;)I"));
        let source = JavaSource {
            package: Some(PackageDecl {
                name: "a".to_string(),
                span: Span::new(8, 9),
            }),
            classes: vec![caller],
            references: vec![ReferenceSite {
                span: prefix_of(CALLER, "x()", 1),
                target: Some(Symbol::method("a/Point", "x", "()I")),
                qualifier: None,
                context: RefContext::Code,
                enclosing: span_of(CALLER, "int read").start,
            }],
            ..JavaSource::default()
        };
        index.files.insert("src/a/Caller.java".to_string(), source);
        index.libraries.clear();
        index
    }

    fn field_chain() -> Arc<MappingChain> {
        let mut table = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut point = ClassEntry::new(names(&["a/Point", "a/Point"]));
        point.fields.push(FieldEntry {
            names: names(&["x", "horizontal"]),
            desc: Some("I".to_string()),
        });
        table.insert_class(point);
        Arc::new(MappingChain::new().with_hop(&table, "old", "new").unwrap())
    }

    #[test]
    fn accessor_call_in_an_earlier_file_is_renamed_in_the_next_round() {
        let store = MemoryArtifactStore::new()
            .with("src/a/Caller.java", CALLER)
            .with("src/a/Point.java", POINT);
        let plan = coordinator(caller_index()).resolve(&store, field_chain()).unwrap();

        assert_eq!(plan.rounds, 2);
        assert!(plan.converged);
        assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);

        let caller = plan.patches.iter().find(|p| p.path == "src/a/Caller.java").unwrap();
        assert_eq!(
            caller.apply(CALLER).unwrap(),
            "package a;\n\nclass Caller {\n    int read(Point p) { return p.horizontal(); }\n}\n"
        );
        let point = plan.patches.iter().find(|p| p.path == "src/a/Point.java").unwrap();
        assert_eq!(
            point.apply(POINT).unwrap(),
            "package a;\n\nrecord Point(int horizontal) implements Coord {\n    int twice() { return horizontal * 2; }\n}\n"
        );
    }
}

mod mixin_shadow {
    use super::*;

    const MIXIN: &str = "package a.mixin;\n\n\
                         @Mixin(Mob.class)\n\
                         abstract class MobMixin {\n    \
                         @Shadow float hp;\n    \
                         float heal() { return this.hp; }\n\
                         }\n";

    fn index() -> SourceIndex {
        let mut mob_mixin = class("a/mixin/MobMixin");
        mob_mixin.name_span = Some(span_of(MIXIN, "MobMixin"));
        mob_mixin.decl_start = span_of(MIXIN, "@Mixin").start;
        mob_mixin.fields.push(FieldDecl {
            name: "hp".to_string(),
            desc: "F".to_string(),
            name_span: Some(prefix_of(MIXIN, "hp;", 2)),
            decl_start: span_of(MIXIN, "@Shadow").start,
            is_static: false,
            is_private: false,
        });
        mob_mixin.methods.push(method("heal", "()F"));

        let mixin = AnnotationDecl {
            type_name: "org.spongepowered.asm.mixin.Mixin".to_string(),
            span: span_of(MIXIN, "@Mixin(Mob.class)"),
            args: Some(span_of(MIXIN, "Mob.class")),
            element: AnnotatedElement::Class {
                name: "a/mixin/MobMixin".to_string(),
            },
            attributes: BTreeMap::from([(
                "value".to_string(),
                AnnotationValue::ClassLiteral {
                    name: "net/Mob".to_string(),
                    span: span_of(MIXIN, "Mob.class"),
                },
            )]),
            anchor: span_of(MIXIN, "@Mixin").start,
        };
        let shadow = AnnotationDecl {
            type_name: "org.spongepowered.asm.mixin.Shadow".to_string(),
            span: span_of(MIXIN, "@Shadow"),
            args: None,
            element: AnnotatedElement::Field {
                owner: "a/mixin/MobMixin".to_string(),
                name: "hp".to_string(),
            },
            attributes: BTreeMap::new(),
            anchor: span_of(MIXIN, "@Shadow").start,
        };

        let source = JavaSource {
            package: Some(PackageDecl {
                name: "a.mixin".to_string(),
                span: span_of(MIXIN, "a.mixin"),
            }),
            classes: vec![mob_mixin],
            references: vec![ReferenceSite {
                span: prefix_of(MIXIN, "hp; }", 2),
                target: Some(Symbol::field("a/mixin/MobMixin", "hp")),
                qualifier: None,
                context: RefContext::Code,
                enclosing: span_of(MIXIN, "float heal").start,
            }],
            annotations: vec![mixin, shadow],
            ..JavaSource::default()
        };
        SourceIndex {
            files: BTreeMap::from([("src/a/mixin/MobMixin.java".to_string(), source)]),
            libraries: vec![class("net/Mob")],
        }
    }

    #[test]
    fn shadowed_field_follows_its_target() {
        let mut table = MappingTable::new(names(&["old", "new"])).unwrap();
        let mut mob = ClassEntry::new(names(&["net/Mob", "net/Mob"]));
        mob.fields.push(FieldEntry {
            names: names(&["hp", "health"]),
            desc: Some("F".to_string()),
        });
        table.insert_class(mob);
        let chain = Arc::new(MappingChain::new().with_hop(&table, "old", "new").unwrap());

        let mut store = MemoryArtifactStore::new().with("src/a/mixin/MobMixin.java", MIXIN);
        let coordinator = coordinator(index());
        let plan = coordinator.resolve(&store, chain).unwrap();
        assert_eq!(plan.rounds, 2);
        assert!(plan.converged);

        coordinator.write(&mut store, &plan).unwrap();
        let out = store.read("src/a/mixin/MobMixin.java").unwrap();
        assert!(out.contains("@Shadow float health;"));
        assert!(out.contains("return this.health;"));
    }
}
