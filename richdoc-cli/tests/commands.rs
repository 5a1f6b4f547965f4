use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const HELLO: &str = r#"{"type": "doc", "content": [
    {"type": "paragraph", "content": [{"type": "text", "text": "hello world"}]}
]}"#;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
#[allow(deprecated)]
fn test_apply_prints_resulting_document() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);
    let steps = write(
        dir.path(),
        "steps.json",
        r#"[{"stepType": "replace", "from": 1, "to": 7}]"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["apply", "--doc", &doc, "--steps", &steps]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#"doc(paragraph("world"))"#));
}

#[test]
#[allow(deprecated)]
fn test_apply_json_output() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);
    let steps = write(
        dir.path(),
        "steps.json",
        r#"[{"stepType": "addMark", "from": 1, "to": 6, "mark": {"type": "em"}}]"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["apply", "--doc", &doc, "--steps", &steps, "--json"]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let text = &json["content"][0]["content"];
    assert_eq!(text[0]["text"], "hello");
    assert_eq!(text[0]["marks"][0]["type"], "em");
    assert_eq!(text[1]["text"], " world");
}

#[test]
#[allow(deprecated)]
fn test_apply_reports_failing_step() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);
    let steps = write(
        dir.path(),
        "steps.json",
        r#"[{"stepType": "replace", "from": 1, "to": 2},
            {"stepType": "replace", "from": 1, "to": 200}]"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["apply", "--doc", &doc, "--steps", &steps]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: step 1"));
}

#[test]
#[allow(deprecated)]
fn test_apply_rejects_non_array_steps() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);
    let steps = write(dir.path(), "steps.json", r#"{"stepType": "replace"}"#);

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["apply", "--doc", &doc, "--steps", &steps]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
#[allow(deprecated)]
fn test_map_reports_deleted_positions() {
    let dir = tempdir().unwrap();
    let steps = write(
        dir.path(),
        "steps.json",
        r#"[{"stepType": "replace", "from": 1, "to": 7}]"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["map", "--steps", &steps, "--pos", "3"]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pos"], 1);
    assert_eq!(json["deleted"], true);

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["map", "--steps", &steps, "--pos", "9", "--assoc", "before"]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["pos"], 3);
    assert_eq!(json["deleted"], false);
}

#[test]
#[allow(deprecated)]
fn test_check_accepts_valid_document() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["check", "--doc", &doc]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ok:"));
}

#[test]
#[allow(deprecated)]
fn test_check_rejects_invalid_document() {
    let dir = tempdir().unwrap();
    let doc = write(
        dir.path(),
        "doc.json",
        r#"{"type": "doc", "content": [{"type": "text", "text": "loose"}]}"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["check", "--doc", &doc]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: invalid document"));
}

#[test]
#[allow(deprecated)]
fn test_check_with_custom_schema() {
    let dir = tempdir().unwrap();
    let schema = write(
        dir.path(),
        "schema.json",
        r#"{"nodes": [{"name": "doc", "content": "text*"}, {"name": "text"}]}"#,
    );
    let doc = write(
        dir.path(),
        "doc.json",
        r#"{"type": "doc", "content": [{"type": "text", "text": "plain"}]}"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["check", "--doc", &doc, "--schema", &schema]);
    cmd.assert().success();

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["check", "--doc", &doc]);
    cmd.assert().failure().code(1);
}

#[test]
#[allow(deprecated)]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.json");

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.arg("check").arg("--doc").arg(&missing);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: reading"));
}

#[test]
#[allow(deprecated)]
fn test_steps_with_reversed_positions_are_rejected() {
    let dir = tempdir().unwrap();
    let doc = write(dir.path(), "doc.json", HELLO);
    let steps = write(
        dir.path(),
        "steps.json",
        r#"[{"stepType": "replace", "from": 7, "to": 1}]"#,
    );

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["apply", "--doc", &doc, "--steps", &steps]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("step positions out of order"));

    let mut cmd = Command::cargo_bin("richdoc").unwrap();
    cmd.args(["map", "--steps", &steps, "--pos", "3"]);
    cmd.assert().failure().code(1);
}
