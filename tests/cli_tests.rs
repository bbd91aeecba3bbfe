//! Integration tests for the trev CLI
//!
//! These tests run the actual CLI binary against traces recorded with the
//! library and verify output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use trev::{EventRecorder, Node, NodeRef, TraceWriter};

const SOURCE: &str = "x = y() + 123; z = 4;";

/// Get the binary to test
fn trev_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trev").unwrap();
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("TREV_TRACE_DIR")
        .env_remove("TREV_LOG");
    cmd
}

fn program() -> Node {
    let mut root = Node::new("Program")
        .with_span(0, 21)
        .child(
            Node::new("ExpressionStatement").with_span(0, 14).child(
                Node::new("AssignmentExpression")
                    .with_span(0, 13)
                    .child(Node::new("Identifier").with_span(0, 1))
                    .child(
                        Node::new("BinaryExpression")
                            .with_span(4, 13)
                            .child(
                                Node::new("CallExpression")
                                    .with_span(4, 7)
                                    .child(Node::new("Identifier").with_span(4, 5)),
                            )
                            .child(Node::new("NumericLiteral").with_span(10, 13)),
                    ),
            ),
        )
        .child(
            Node::new("ExpressionStatement").with_span(15, 21).child(
                Node::new("AssignmentExpression")
                    .with_span(15, 20)
                    .child(Node::new("Identifier").with_span(15, 16))
                    .child(Node::new("NumericLiteral").with_span(19, 20)),
            ),
        );
    root.assign_ids(1);
    root
}

/// Record `x = y() + 123; z = 4;` into `<dir>/traces/demo.ndjson`
fn record_demo(dir: &Path) -> PathBuf {
    let writer = Arc::new(TraceWriter::create(&dir.join("traces"), "demo").unwrap());
    let mut rec = EventRecorder::new().with_listener(writer.clone());
    rec.register_unit("main.js", &program(), Some(SOURCE));

    let node = |id| NodeRef::new("main.js", id);
    rec.call_start(&node(6), json!([]));
    rec.expression(&node(7), json!("y"));
    rec.call_return(&node(6), json!(100));
    rec.expression(&node(8), json!(123));
    rec.expression(&node(5), json!(223));
    rec.expression(&node(4), json!(223));
    rec.expression(&node(12), json!(4));
    rec.expression(&node(10), json!(4));

    writer.flush().unwrap();
    writer.path().to_path_buf()
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    trev_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("facets"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("events"))
        .stdout(predicate::str::contains("scan"));
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_consistent_trace() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("check")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("is consistent"))
        .stdout(predicate::str::contains("Events: 8"))
        .stdout(predicate::str::contains("Nodes: 12"))
        .stdout(predicate::str::contains("Max depth: 1"));
}

#[test]
fn test_check_reports_dangling_parent_with_fix() {
    let temp_dir = TempDir::new().unwrap();
    let trace = temp_dir.path().join("broken.ndjson");
    fs::write(
        &trace,
        concat!(
            r#"{"unitId":"main.js","unit":{"id":1,"type":"Program"}}"#,
            "\n",
            r#"{"id":2,"parentId":1,"kind":"expression","unitId":"main.js","nodeId":1,"data":null}"#,
            "\n"
        ),
    )
    .unwrap();

    trev_cmd(temp_dir.path())
        .arg("check")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TREV-011"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_check_reports_malformed_line() {
    let temp_dir = TempDir::new().unwrap();
    let trace = temp_dir.path().join("bad.ndjson");
    fs::write(&trace, "{\"id\":1}\nnot json\n").unwrap();

    trev_cmd(temp_dir.path())
        .arg("check")
        .arg(&trace)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TREV-092"))
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_check_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    trev_cmd(temp_dir.path())
        .args(["check", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load trace"));
}

// ============================================================================
// events / facets / scan
// ============================================================================

#[test]
fn test_events_indents_by_depth() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("events")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("call_start CallExpression `y()`"))
        .stdout(predicate::str::contains("  expression Identifier `y`"))
        .stdout(predicate::str::contains("call_return CallExpression"));
}

#[test]
fn test_events_filter_by_kind() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("events")
        .arg(&trace)
        .args(["--kind", "call_return"])
        .assert()
        .success()
        .stdout(predicate::str::contains("call_return"))
        .stdout(predicate::str::contains("Identifier").not())
        .stdout(predicate::str::contains("NumericLiteral").not());
}

#[test]
fn test_events_rejects_unknown_kind() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("events")
        .arg(&trace)
        .args(["--kind", "return"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown event kind"));
}

#[test]
fn test_facets_counts_kinds_and_types() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("facets")
        .arg(&trace)
        .assert()
        .success()
        .stdout(predicate::str::contains("8 events"))
        .stdout(predicate::str::contains("By node type"))
        .stdout(predicate::str::contains("main.js:6"));
}

#[test]
fn test_scan_by_code() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("scan")
        .arg(&trace)
        .args(["--code", "123", "--code", "z = 4;"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NumericLiteral  `123`"))
        .stdout(predicate::str::contains("ExpressionStatement  `z = 4;`"))
        .stdout(predicate::str::contains("2 node(s) matched"));
}

#[test]
fn test_scan_by_type_and_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("scan")
        .arg(&trace)
        .args(["--type", "Identifier", "--pattern", "^[xz]$"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 node(s) matched"));
}

#[test]
fn test_scan_invalid_pattern() {
    let temp_dir = TempDir::new().unwrap();
    let trace = record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .arg("scan")
        .arg(&trace)
        .args(["--pattern", "("])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --pattern"));
}

// ============================================================================
// Config + trace directory
// ============================================================================

#[test]
fn test_trace_name_resolves_in_configured_dir() {
    let temp_dir = TempDir::new().unwrap();
    record_demo(temp_dir.path());
    fs::write(temp_dir.path().join("trev.yaml"), "trace_dir: traces\n").unwrap();

    trev_cmd(temp_dir.path())
        .args(["check", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Trace 'demo' is consistent"));
}

#[test]
fn test_ls_uses_env_override() {
    let temp_dir = TempDir::new().unwrap();
    record_demo(temp_dir.path());

    trev_cmd(temp_dir.path())
        .env("TREV_TRACE_DIR", temp_dir.path().join("traces"))
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn test_ls_empty_dir() {
    let temp_dir = TempDir::new().unwrap();
    trev_cmd(temp_dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No traces"));
}

#[test]
fn test_malformed_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("custom.yaml");
    fs::write(&config, "facet_limit: [oops").unwrap();

    trev_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config)
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TREV-093"));
}
