//! Filesystem round trip: inputs on disk, artifacts on disk.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use schemafix_core::adapters::{FsItemSource, FsWritePort};
use schemafix_core::pipeline::{run_repair, write_repair_artifacts};
use schemafix_core::settings::{RepairSettings, RunMode};
use schemafix_types::report::ReportToolInfo;
use serde_json::{Value, json};
use tempfile::TempDir;

fn tool() -> ReportToolInfo {
    ReportToolInfo {
        name: "schemafix".into(),
        version: "0.0.0-test".into(),
    }
}

fn read_json(path: &Utf8PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json")
}

#[test]
fn json_lines_batch_is_repaired_and_persisted() {
    let temp = TempDir::new().expect("temp");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    std::fs::write(
        root.join("schema.json"),
        r#"{"type":"object","properties":{"tags":{"type":"array","uniqueItems":true,"maxItems":2}},"additionalProperties":false}"#,
    )
    .expect("schema");
    std::fs::write(
        root.join("items.jsonl"),
        "{\"tags\":[1,1,2,3]}\n{\"tags\":[],\"extra\":true}\n{}\n",
    )
    .expect("items");

    let source = FsItemSource::new(root.join("schema.json"), root.join("items.jsonl"));
    let out_dir = root.join("out");
    let settings = RepairSettings {
        out_dir: out_dir.clone(),
        jobs: 2,
        ..Default::default()
    };
    let outcome = run_repair(&settings, &source, tool()).expect("run_repair");
    write_repair_artifacts(&outcome, &settings.out_dir, &FsWritePort).expect("write");

    assert_eq!(outcome.exit_code(RunMode::Standalone), 0);
    let items = read_json(&out_dir.join("items.json"));
    assert_eq!(items, json!([{"tags": [1, 2]}, {"tags": []}, {}]));

    let actions = read_json(&out_dir.join("actions.json"));
    let kinds: Vec<&str> = actions
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|a| a["action"].as_str())
        .collect();
    assert!(kinds.contains(&"dedupeArray"));
    assert!(kinds.contains(&"deleteProperty"));

    let report = read_json(&out_dir.join("report.json"));
    assert_eq!(report["verdict"]["status"], json!("pass"));
    assert_eq!(report["verdict"]["counts"]["alreadyValid"], json!(1));
    assert_eq!(report["run"]["jobs"], json!(2));
    assert_eq!(read_json(&out_dir.join("coverage.json")), json!([]));
    assert!(out_dir.join("report.md").is_file());
}
