//! Command Integration Tests
//!
//! Runs each subcommand against documents written to a temp directory.

use std::path::{Path, PathBuf};

use clap::Parser;
use designer_cli::{run, CliArgs};

const DESIGN: &str = r#"{
    "components": [
        {"id": "page", "props": {"type": "container"}},
        {"id": "row", "parentId": "page", "props": {"type": "row", "gutter": 0}},
        {"id": "left", "parentId": "row", "props": {"type": "col", "span": 6},
         "styles": {"height": 40}, "position": {"zIndex": 0, "order": 0}},
        {"id": "right", "parentId": "row", "props": {"type": "col", "span": 6},
         "styles": {"height": 40}, "position": {"zIndex": 0, "order": 1}}
    ]
}"#;

const OVERLAPPING: &str = r#"{
    "components": [
        {"id": "canvas", "props": {"type": "container"}, "styles": {"height": 600}},
        {"id": "a", "parentId": "canvas", "props": {"type": "container"},
         "styles": {"position": "absolute", "left": 0, "top": 0, "width": 100, "height": 100},
         "position": {"zIndex": 0, "order": 0}},
        {"id": "b", "parentId": "canvas", "props": {"type": "container"},
         "styles": {"position": "absolute", "left": 50, "top": 50, "width": 100, "height": 100},
         "position": {"zIndex": 0, "order": 1}}
    ]
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

fn run_args(args: &[&str]) -> designer_cli::Outcome {
    let mut argv = vec!["page-designer"];
    argv.extend_from_slice(args);
    let args = CliArgs::try_parse_from(argv).expect("valid arguments");
    run(&args).expect("command succeeds")
}

// ============================================================================
// layout / align
// ============================================================================

#[test]
fn test_layout_prints_resolved_rectangles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let design = write(dir.path(), "design.json", DESIGN);

    let outcome = run_args(&["layout", design.to_str().expect("utf-8 path")]);
    assert!(outcome.success);
    assert!(outcome.output.contains("    left (col) x=0 y=0 w=600 h=40"));
    assert!(outcome.output.contains("    right (col) x=600 y=0 w=600 h=40"));
}

#[test]
fn test_align_reports_snapped_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let design = write(dir.path(), "design.json", OVERLAPPING);

    let outcome = run_args(&[
        "align",
        design.to_str().expect("utf-8 path"),
        "b",
        "--x",
        "103",
        "--y",
        "300",
        "--threshold",
        "5",
    ]);
    assert!(outcome.output.starts_with("snapped: x=100 y=300"));
    assert!(outcome.output.contains("strong vertical guide at 100 from component:a"));
}

// ============================================================================
// validate / history
// ============================================================================

#[test]
fn test_validate_flags_overlap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let design = write(dir.path(), "design.json", OVERLAPPING);

    let outcome = run_args(&["validate", design.to_str().expect("utf-8 path")]);
    assert!(!outcome.success);
    assert!(outcome.output.contains(r#"layout: {"kind":"overlap","a":"a","b":"b"}"#));
}

#[test]
fn test_validate_clean_design() {
    let dir = tempfile::tempdir().expect("tempdir");
    let design = write(dir.path(), "design.json", DESIGN);

    let outcome = run_args(&["validate", design.to_str().expect("utf-8 path")]);
    assert!(outcome.success);
    assert_eq!(outcome.output, "ok\n");
}

#[test]
fn test_history_summary() {
    use designer_core::history::{DesignSnapshot, NewHistoryItem};
    use designer_core::{HistoryActionType, HistoryManager};

    let mut history = HistoryManager::default();
    let snapshot = DesignSnapshot::default();
    history.add_history_item(
        NewHistoryItem::new(HistoryActionType::AddComponent, "Add row", &snapshot, &snapshot)
            .with_component("row"),
    );
    let dir = tempfile::tempdir().expect("tempdir");
    let export = write(
        dir.path(),
        "history.json",
        &history.export_history().expect("export"),
    );

    let outcome = run_args(&["history", export.to_str().expect("utf-8 path")]);
    assert!(outcome.output.contains("entries: 1"));
    assert!(outcome.output.contains("cursor: 0"));
    assert!(outcome.output.contains("add_component (Add row)"));
}

#[test]
fn test_missing_design_is_an_error() {
    let args = CliArgs::try_parse_from(["page-designer", "layout", "/nonexistent/design.json"])
        .expect("valid arguments");
    let err = run(&args).expect_err("missing file");
    assert!(err.to_string().contains("Failed to read design"));
}
