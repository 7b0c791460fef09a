//! End-to-end runs over a workspace on disk: configuration, mapping load,
//! resolution and writing.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use remap::cli::run_remap;
use remap::config::{CliOverrides, ResolvedConfig, CONFIG_FILE};
use remap::diagnostic::DiagnosticKind;
use remap::error::RemapError;

const TINY: &str = "tiny\t2\t0\tintermediary\tnamed\n\
                    c\tnet/C_1\tnet/Main\n\
                    \tf\tI\tf_1\tcount\n\
                    \tm\t()V\tm_1\tstart\n";

const WIDENER: &str = "accessWidener v2 intermediary\n\
                       accessible class net/C_1\n\
                       accessible field net/C_1 f_1 I\n\
                       accessible method net/C_1 m_1 ()V\n";

const MOD_JSON: &str = r#"{
  "schemaVersion": 1,
  "entrypoints": {
    "main": ["net.C_1", { "value": "net.C_1::m_1" }]
  }
}
"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(
        root.join(CONFIG_FILE),
        "max_rounds = 4\n\n[[mappings]]\npath = \"mappings/named.tiny\"\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("mappings")).unwrap();
    fs::write(root.join("mappings/named.tiny"), TINY).unwrap();
    fs::create_dir_all(root.join("src/main/resources")).unwrap();
    fs::write(root.join("src/main/resources/mod.accesswidener"), WIDENER).unwrap();
    fs::write(root.join("src/main/resources/fabric.mod.json"), MOD_JSON).unwrap();
    dir
}

fn config(root: &Path, overrides: &CliOverrides) -> ResolvedConfig {
    ResolvedConfig::resolve_with_env(root, overrides, |_| None).unwrap()
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = workspace();
    let root = dir.path();
    let response = run_remap(root, &config(root, &CliOverrides::default()), false).unwrap();

    assert_eq!(response.status, "ok");
    assert!(response.converged);
    assert!(response.applied.is_none());
    assert_eq!(response.summary.files_changed, 2);
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    // Edits are ordered by file then offset.
    let files: Vec<&str> = response.edits.iter().map(|e| e.file.as_str()).collect();
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);

    assert_eq!(read(root, "src/main/resources/mod.accesswidener"), WIDENER);
}

#[test]
fn apply_rewrites_every_artifact() {
    let dir = workspace();
    let root = dir.path();
    let response = run_remap(root, &config(root, &CliOverrides::default()), true).unwrap();

    assert_eq!(response.applied, Some(true));
    assert_eq!(response.files_written.as_ref().map(Vec::len), Some(2));
    assert_eq!(
        read(root, "src/main/resources/mod.accesswidener"),
        "accessWidener v2 named\n\
         accessible class net/Main\n\
         accessible field net/Main count I\n\
         accessible method net/Main start ()V\n"
    );
    let mod_json = read(root, "src/main/resources/fabric.mod.json");
    assert!(mod_json.contains(r#"["net.Main", { "value": "net.Main::start" }]"#), "{mod_json}");

    // A second run over the output finds nothing to do.
    let again = run_remap(root, &config(root, &CliOverrides::default()), false).unwrap();
    assert!(again.edits.is_empty());
}

#[test]
fn excluded_paths_are_left_alone() {
    let dir = workspace();
    let root = dir.path();
    let overrides = CliOverrides {
        exclude_patterns: vec!["**/*.json".to_string()],
        ..CliOverrides::default()
    };
    let response = run_remap(root, &config(root, &overrides), false).unwrap();
    assert_eq!(response.summary.files_changed, 1);
    assert!(response.edits.iter().all(|e| e.file.ends_with(".accesswidener")));
}

#[test]
fn overloaded_entrypoint_member_is_reported() {
    let dir = workspace();
    let root = dir.path();
    fs::write(
        root.join("mappings/named.tiny"),
        format!("{TINY}\tm\t(I)V\tm_1\trun\n"),
    )
    .unwrap();
    fs::remove_file(root.join("src/main/resources/mod.accesswidener")).unwrap();

    let response = run_remap(root, &config(root, &CliOverrides::default()), false).unwrap();
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].kind, DiagnosticKind::Ambiguous);
    assert_eq!(response.diagnostics[0].candidates.len(), 2);
    // The class is still renamed; the member reference is left as written.
    assert!(response.edits.iter().any(|e| e.new_text == "\"net.Main\""));
    assert!(response.edits.iter().all(|e| !e.old_text.contains("m_1")));
}

#[test]
fn missing_mapping_file_is_a_resolution_error() {
    let dir = workspace();
    let root = dir.path();
    fs::remove_file(root.join("mappings/named.tiny")).unwrap();
    let err = run_remap(root, &config(root, &CliOverrides::default()), false).unwrap_err();
    assert!(matches!(err, RemapError::FileNotFound { .. }));
    assert_eq!(err.error_code().code(), 3);
}
