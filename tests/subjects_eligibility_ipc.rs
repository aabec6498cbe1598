use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_examd");
    let mut child = Command::new(exe)
        .env_remove("EXAMD_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn examd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn school_classes() -> serde_json::Value {
    json!([
        { "id": "c-jss1", "name": "JSS1" },
        { "id": "c-jss2", "name": "JSS2" },
        { "id": "c-jss3", "name": "JSS3" },
        { "id": "c-ss1", "name": "SS1" },
        { "id": "c-ss2", "name": "SS2" },
        { "id": "c-ss3", "name": "SS3" }
    ])
}

fn senior_arts() -> serde_json::Value {
    json!({
        "level": "Senior",
        "departments": ["Commercial", "Arts"],
        "applicableLevels": ["SS1", "SS2", "SS3"],
        "classes": ["c-ss1"]
    })
}

#[test]
fn level_change_applies_rule_table() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let junior = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.levelChange",
        json!({ "state": senior_arts(), "level": "Junior", "classes": school_classes() }),
    );
    assert_eq!(junior["level"], "Junior");
    assert_eq!(junior["applicableLevels"], json!(["JSS1", "JSS2", "JSS3"]));
    assert_eq!(junior["departments"], json!(["All"]));
    assert_eq!(junior["classes"], json!([]));

    let check = request_ok(
        &mut stdin,
        &mut reader,
        "1b",
        "subjects.reconcile",
        json!({ "state": junior, "classes": school_classes() }),
    );
    assert_eq!(check["wasConsistent"], true);
    assert_eq!(check["state"]["level"], "Junior");

    let senior = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.levelChange",
        json!({ "state": senior_arts(), "level": "Senior", "classes": school_classes() }),
    );
    assert_eq!(senior["departments"], json!(["Commercial", "Arts"]));
    assert_eq!(senior["classes"], json!(["c-ss1"]));

    let both = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.levelChange",
        json!({ "state": senior_arts(), "level": "Both", "classes": school_classes() }),
    );
    assert_eq!(
        both["applicableLevels"],
        json!(["JSS1", "JSS2", "JSS3", "SS1", "SS2", "SS3"])
    );
    assert_eq!(both["departments"], json!(["All"]));
    assert_eq!(both["classes"], json!([]));

    let fresh = request_ok(&mut stdin, &mut reader, "4", "subjects.levelChange", json!({ "level": "Senior" }));
    assert_eq!(fresh["departments"], json!(["All"]));
    assert_eq!(fresh["classes"], json!([]));

    let bad = request(&mut stdin, &mut reader, "5", "subjects.levelChange", json!({ "level": "Primary" }));
    assert_eq!(error_code(&bad), Some("bad_params"));

    let no_catalog = request(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.levelChange",
        json!({ "state": senior_arts(), "level": "Junior" }),
    );
    assert_eq!(error_code(&no_catalog), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn class_selection_drives_level() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let mixed = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.classToggle",
        json!({ "state": senior_arts(), "selectedClassIds": ["c-ss1", "c-jss1"], "classes": school_classes() }),
    );
    assert_eq!(mixed["level"], "Both");
    assert_eq!(mixed["applicableLevels"].as_array().map(|a| a.len()), Some(6));
    assert_eq!(mixed["departments"], json!(["All"]));

    let senior_only = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.classToggle",
        json!({ "state": senior_arts(), "selectedClassIds": ["c-ss2", "c-ss3", "deleted"], "classes": school_classes() }),
    );
    assert_eq!(senior_only["level"], "Senior");
    assert_eq!(senior_only["departments"], json!(["Commercial", "Arts"]));
    assert_eq!(senior_only["classes"], json!(["c-ss2", "c-ss3"]));

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.classToggle",
        json!({ "state": senior_only, "selectedClassIds": ["c-ss2", "c-ss3", "deleted"], "classes": school_classes() }),
    );
    assert_eq!(again, senior_only);

    let junior = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.toggleClass",
        json!({ "state": { "level": "Senior", "departments": ["Science"], "applicableLevels": ["SS1", "SS2", "SS3"], "classes": [] }, "classId": "c-jss3", "classes": school_classes() }),
    );
    assert_eq!(junior["level"], "Junior");
    assert_eq!(junior["departments"], json!(["All"]));
    assert_eq!(junior["classes"], json!([]));

    let check = request_ok(
        &mut stdin,
        &mut reader,
        "1b",
        "subjects.reconcile",
        json!({ "state": junior, "classes": school_classes() }),
    );
    assert_eq!(check["wasConsistent"], true);
    assert_eq!(check["state"]["level"], "Junior");
    assert_eq!(junior["classes"], json!(["c-jss3"]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn reconcile_repairs_inconsistent_subjects() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let ok_state = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.reconcile",
        json!({ "state": senior_arts(), "classes": school_classes() }),
    );
    assert_eq!(ok_state["wasConsistent"], true);
    assert_eq!(ok_state["state"], senior_arts());
    assert!(ok_state["problem"].is_null());

    let broken = json!({
        "level": "Senior",
        "departments": ["Science"],
        "applicableLevels": ["SS1", "SS2", "SS3"],
        "classes": ["c-jss1", "c-ss1"]
    });
    let fixed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.reconcile",
        json!({ "state": broken, "classes": school_classes() }),
    );
    assert_eq!(fixed["wasConsistent"], false);
    assert_eq!(fixed["problem"]["code"], "inconsistent_catalog_state");
    assert_eq!(fixed["state"]["level"], "Both");
    assert_eq!(fixed["state"]["departments"], json!(["All"]));

    drop(stdin);
    let _ = child.wait();
}
