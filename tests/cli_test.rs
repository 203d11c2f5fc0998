//! End-to-end runs of the tsgraph binary over snapshot files on disk.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tsgraph::checker::{NodeKind, ProgramBuilder, SymbolFlags};
use tsgraph::config::ProjectSnapshot;
use tsgraph::types::Span;

fn write_snapshot(dir: &Path) -> std::path::PathBuf {
    let mut b = ProgramBuilder::new("/work");
    let file = b.add_file("/work/a.ts", "export const x = 10;");
    let module = b.add_symbol(SymbolFlags::VALUE_MODULE, "\"/work/a\"");
    b.mark_module(file, module);
    let root = b.root_node(file);
    let statement = b.add_node(file, NodeKind::VariableStatement, Span::new(0, 20));
    b.child(root, statement);
    let declaration = b.add_node(file, NodeKind::VariableDeclaration, Span::new(13, 19));
    b.child(statement, declaration);
    let x = b.add_symbol(SymbolFlags::BLOCK_SCOPED_VARIABLE, "x");
    b.add_declaration(x, declaration);
    let name = b.ident(file, declaration, Span::new(13, 14), "x", Some(x));
    b.set_name(declaration, name);
    b.add_export(module, "x", x);

    let snapshot = ProjectSnapshot {
        name: Some("demo".to_string()),
        tsconfig: Default::default(),
        program: b.build(),
    };
    let path = dir.join("program.json");
    std::fs::write(&path, serde_json::to_string(&snapshot).unwrap()).unwrap();
    path
}

#[test]
fn test_line_dump_to_stdout() {
    let tmp = TempDir::new().unwrap();
    let snapshot = write_snapshot(tmp.path());

    let output = Command::new(env!("CARGO_BIN_EXE_tsgraph"))
        .arg("-p")
        .arg(&snapshot)
        .arg("--stdout")
        .output()
        .expect("binary runs");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.is_empty()).collect();
    assert!(lines.len() > 5, "dump has elements");

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["type"], "vertex");
    assert_eq!(first["label"], "metaData");

    // The exported const surfaces as a group export moniker.
    assert!(lines.iter().any(|line| {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        value["label"] == "moniker"
            && value["identifier"] == "a:x"
            && value["kind"] == "export"
            && value["unique"] == "group"
    }));
}

#[test]
fn test_json_dump_is_a_bracketed_array() {
    let tmp = TempDir::new().unwrap();
    let snapshot = write_snapshot(tmp.path());

    let output = Command::new(env!("CARGO_BIN_EXE_tsgraph"))
        .arg("-p")
        .arg(&snapshot)
        .arg("--stdout")
        .arg("--outputFormat")
        .arg("json")
        .output()
        .expect("binary runs");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let elements: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert!(!elements.is_empty());
    assert_eq!(elements[0]["label"], "metaData");
}

#[test]
fn test_dump_written_to_out_file() {
    let tmp = TempDir::new().unwrap();
    let snapshot = write_snapshot(tmp.path());
    let out = tmp.path().join("dump.lsif");

    let status = Command::new(env!("CARGO_BIN_EXE_tsgraph"))
        .arg("-p")
        .arg(&snapshot)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("binary runs");
    assert!(status.success());

    let body = std::fs::read_to_string(&out).unwrap();
    assert!(body.lines().count() > 5);
}

#[test]
fn test_missing_project_file_exits_one() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tsgraph"))
        .arg("-p")
        .arg(tmp.path().join("absent"))
        .arg("--stdout")
        .output()
        .expect("binary runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stderr).is_empty());
}

#[test]
fn test_uuid_ids_are_strings() {
    let tmp = TempDir::new().unwrap();
    let snapshot = write_snapshot(tmp.path());

    let output = Command::new(env!("CARGO_BIN_EXE_tsgraph"))
        .arg("-p")
        .arg(&snapshot)
        .arg("--stdout")
        .arg("--id")
        .arg("uuid")
        .output()
        .expect("binary runs");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let first: serde_json::Value = serde_json::from_str(stdout.lines().next().unwrap()).unwrap();
    assert!(first["id"].is_string());
}
