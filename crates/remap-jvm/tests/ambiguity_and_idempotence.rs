//! Override ambiguity across supertypes, and re-running over remapped output.

use std::collections::BTreeMap;
use std::sync::Arc;

use remap_core::artifact::{ArtifactStore, MemoryArtifactStore};
use remap_core::coordinator::{Coordinator, RunOptions};
use remap_core::diagnostic::{DiagnosticKind, MARKER};
use remap_core::mapping::chain::MappingChain;
use remap_core::mapping::table::{ClassEntry, FieldEntry, MappingTable, MethodEntry};
use remap_core::patch::{EditKind, Span};
use remap_jvm::model::{ClassDecl, JavaSource, MethodDecl, SourceIndex};
use remap_jvm::{default_adapters, SymbolTable};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn class(name: &str, supertypes: &[&str], methods: Vec<MethodDecl>) -> ClassDecl {
    ClassDecl {
        jvm_name: name.to_string(),
        name_span: None,
        decl_start: 0,
        supertypes: names(supertypes),
        is_record: false,
        fields: vec![],
        methods,
        record_components: vec![],
    }
}

fn run_method(name_span: Option<Span>, decl_start: u64) -> MethodDecl {
    MethodDecl {
        name: "run".to_string(),
        desc: "()V".to_string(),
        name_span,
        decl_start,
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

mod overrides {
    use super::*;

    const TASK: &str = "class Task implements Left, Right {\n    public void run() {}\n}\n";

    fn index() -> SourceIndex {
        let start = TASK.find("public").unwrap() as u64;
        let name = TASK.find("run").unwrap() as u64;
        let task = class(
            "Task",
            &["lib/Left", "lib/Right"],
            vec![run_method(Some(Span::new(name, name + 3)), start)],
        );
        let source = JavaSource {
            classes: vec![task],
            ..JavaSource::default()
        };
        SourceIndex {
            files: BTreeMap::from([("Task.java".to_string(), source)]),
            libraries: vec![
                class("lib/Left", &[], vec![run_method(None, 0)]),
                class("lib/Right", &[], vec![run_method(None, 0)]),
            ],
        }
    }

    fn chain(left: &str, right: &str) -> Arc<MappingChain> {
        let mut table = MappingTable::new(names(&["old", "new"])).unwrap();
        for (owner, new) in [("lib/Left", left), ("lib/Right", right)] {
            let mut entry = ClassEntry::new(names(&[owner, owner]));
            entry.methods.push(MethodEntry {
                names: names(&["run", new]),
                desc: "()V".to_string(),
            });
            table.insert_class(entry);
        }
        Arc::new(MappingChain::new().with_hop(&table, "old", "new").unwrap())
    }

    #[test]
    fn differing_names_are_reported_not_renamed() {
        let store = MemoryArtifactStore::new().with("Task.java", TASK);
        let plan = coordinator(index()).resolve(&store, chain("start", "begin")).unwrap();

        assert_eq!(plan.diagnostics.len(), 1);
        let diagnostic = &plan.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::Ambiguous);
        assert_eq!(diagnostic.candidates.len(), 2);

        // The only edit is the inserted comment above the method.
        let edits = &plan.patches[0].edits;
        assert!(edits.iter().all(|e| e.kind == EditKind::Insert));
        let out = plan.patches[0].apply(TASK).unwrap();
        assert!(out.contains(&format!("    // {} ambiguous rename of run()V\n", MARKER)));
        assert!(out.contains("    //   lib/Left#run()V -> start\n    //   lib/Right#run()V -> begin\n    public void run()"));
    }

    #[test]
    fn agreeing_names_rename_once() {
        let store = MemoryArtifactStore::new().with("Task.java", TASK);
        let plan = coordinator(index()).resolve(&store, chain("start", "start")).unwrap();

        assert!(plan.diagnostics.is_empty());
        assert_eq!(plan.patches[0].edits.len(), 1);
        assert_eq!(
            plan.patches[0].apply(TASK).unwrap(),
            "class Task implements Left, Right {\n    public void start() {}\n}\n"
        );
    }
}

mod idempotence {
    use super::*;

    const WIDENER: &str = "accessWidener v2 intermediary\n\
                           accessible class net/C_1\n\
                           accessible field net/C_1 f_1 I\n";
    const MOD_JSON: &str = r#"{ "schemaVersion": 1, "entrypoints": { "main": ["net.C_1"] } }"#;

    fn chain() -> Arc<MappingChain> {
        let mut table = MappingTable::new(names(&["intermediary", "named"])).unwrap();
        let mut entry = ClassEntry::new(names(&["net/C_1", "net/Main"]));
        entry.fields.push(FieldEntry {
            names: names(&["f_1", "count"]),
            desc: Some("I".to_string()),
        });
        table.insert_class(entry);
        Arc::new(MappingChain::new().with_hop(&table, "intermediary", "named").unwrap())
    }

    #[test]
    fn second_run_over_output_changes_nothing() {
        let mut store = MemoryArtifactStore::new()
            .with("mod.accesswidener", WIDENER)
            .with("fabric.mod.json", MOD_JSON);
        let coordinator = coordinator(SourceIndex::default());

        let first = coordinator.resolve(&store, chain()).unwrap();
        assert_eq!(first.patches.len(), 2);
        coordinator.write(&mut store, &first).unwrap();
        assert_eq!(
            store.read("mod.accesswidener").unwrap(),
            "accessWidener v2 named\naccessible class net/Main\naccessible field net/Main count I\n"
        );
        assert!(store.read("fabric.mod.json").unwrap().contains(r#"["net.Main"]"#));

        let second = coordinator.resolve(&store, chain()).unwrap();
        assert!(second.is_empty());
        assert!(second.diagnostics.is_empty());
    }
}
