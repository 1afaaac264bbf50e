//! Project generation against temporary directory trees.

use std::fs;
use std::path::Path;

use sgtt::config::{OutputConfig, SgttConfig};
use sgtt::{GenerateOptions, Outcome, generate, report};
use sgtt_runtime::CancelFlag;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn options(root: &Path, config: &SgttConfig) -> GenerateOptions {
    GenerateOptions::from_config(root, config).unwrap()
}

#[test]
fn test_duplicate_template_names_are_numbered() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a/report.sgtt", "<#= \"first\" #>");
    write(root, "b/report.sgtt", "<#= \"second\" #>");

    let summary = generate(&options(root, &SgttConfig::default()), &CancelFlag::new()).unwrap();

    let names: Vec<_> = summary
        .files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["report.cs", "report.1.cs"]);
    assert_eq!(fs::read_to_string(root.join("report.cs")).unwrap(), "first");
    assert_eq!(fs::read_to_string(root.join("report.1.cs")).unwrap(), "second");
    assert!(!summary.has_errors());
}

#[test]
fn test_output_dir_and_includes() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "templates/page.sgtt", "<#@ include file=\"header.ttinc\" #>body");
    write(root, "shared/header.ttinc", "head;");
    write(root, "out/stale.sgtt", "never rendered");

    let config = SgttConfig {
        output: OutputConfig {
            extension: Some("txt".into()),
            dir: Some("out".into()),
        },
        ..Default::default()
    };
    let summary = generate(&options(root, &config), &CancelFlag::new()).unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].outcome, Outcome::Rendered);
    assert_eq!(
        fs::read_to_string(root.join("out").join("page.txt")).unwrap(),
        "head;body"
    );
    assert!(!root.join("out").join("stale.txt").exists());
}

#[test]
fn test_compile_failure_is_written_and_reported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "broken.sgtt", "a\n<# local = 1 #>");

    let summary = generate(&options(root, &SgttConfig::default()), &CancelFlag::new()).unwrap();

    assert_eq!(summary.files[0].outcome, Outcome::CompileFailed);
    assert!(summary.has_errors());
    let diagnostic = summary.diagnostics().next().unwrap();
    assert_eq!(diagnostic.location.file, root.join("broken.sgtt"));
    assert_eq!((diagnostic.location.line, diagnostic.location.column), (2, 9));

    let written = fs::read_to_string(root.join("broken.cs")).unwrap();
    assert!(written.contains("#error broken.sgtt: failed to compile"));
}

#[test]
fn test_cancelled_before_start() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.sgtt", "x");

    let cancel = CancelFlag::new();
    cancel.cancel();
    let summary = generate(&options(dir.path(), &SgttConfig::default()), &cancel).unwrap();

    assert!(summary.cancelled);
    assert!(summary.files.is_empty());
    assert!(!dir.path().join("x.cs").exists());
}

#[test]
fn test_json_summary() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.sgtt", "x");

    let summary = generate(&options(dir.path(), &SgttConfig::default()), &CancelFlag::new()).unwrap();
    let json = report::to_json(&summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["files"][0]["outcome"], "rendered");
    assert_eq!(value["cancelled"], false);
}
