//! Integration tests for CLI commands.

use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_restore-audit"))
}

fn write_input(dir: &TempDir, name: &str, value: &Value) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = bin()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn make_plan_input() -> Value {
    json!({
        "plan_hash_input_version": "plan-hash-input.v1",
        "contract_version": "restore-contracts.v1",
        "pit": {
            "pit_algorithm_version": "pit-tuple.v1",
            "restore_time": "2024-02-01T10:00:00.000Z",
            "tie_breaker": ["sys_updated_on", "sys_mod_count", "event_time", "event_id"]
        },
        "scope": {
            "tenant_id": "tenant-a",
            "instance_id": "inst-1",
            "source": "sn://acme",
            "tables": ["incident"]
        },
        "execution_options": {
            "missing_row_mode": "existing_only",
            "conflict_policy": "skip_row",
            "include_media": false
        },
        "action_counts": {"update": 1, "insert": 0, "delete": 0, "skip": 0},
        "rows": [{
            "row_id": "row-001",
            "table": "incident",
            "record_sys_id": "sys-1",
            "action": "update",
            "precondition_hash": "ab",
            "metadata": {"table": "incident"},
            "values": {"alg": "aes-256-gcm", "key_id": "k1", "iv": "aXY", "ciphertext": "Y3Q"}
        }],
        "media_candidates": []
    })
}

fn make_audit_event(id: &str, service: &str, at: &str) -> Value {
    json!({
        "event_id": id,
        "occurred_at": at,
        "service": service,
        "lifecycle": "authorize",
        "action": "checked",
        "outcome": "accepted"
    })
}

#[test]
fn test_canonicalize_command() {
    let output = run_with_stdin(&["canonicalize"], r#"{"z":{"b":2,"a":1},"a":[3,1,2],"m":null}"#);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"a":[3,1,2],"m":null,"z":{"a":1,"b":2}}"#
    );
}

#[test]
fn test_plan_hash_then_verify() {
    let dir = TempDir::new().unwrap();
    let plan_path = write_input(&dir, "plan.json", &make_plan_input());

    let output = bin().args(["plan-hash", &plan_path, "--json"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let record: Value = serde_json::from_slice(&output.stdout).unwrap();
    let hash = record["plan_hash"].as_str().unwrap().to_string();
    assert_eq!(hash.len(), 64);

    let plain = bin().args(["plan-hash", &plan_path]).output().unwrap();
    assert_eq!(String::from_utf8_lossy(&plain.stdout).trim(), hash);

    let record_path = write_input(&dir, "record.json", &record);
    let verify = bin()
        .args(["verify-plan", &record_path, "--strict", "--json"])
        .output()
        .unwrap();
    assert!(verify.status.success());
    let verdict: Value = serde_json::from_slice(&verify.stdout).unwrap();
    assert_eq!(verdict["valid"], true);
}

#[test]
fn test_verify_plan_strict_fails_on_tampering() {
    let dir = TempDir::new().unwrap();
    let plan_path = write_input(&dir, "plan.json", &make_plan_input());
    let output = bin().args(["plan-hash", &plan_path, "--json"]).output().unwrap();
    let mut record: Value = serde_json::from_slice(&output.stdout).unwrap();
    let tampered = record["canonical_json"]
        .as_str()
        .unwrap()
        .replace("\"update\":1", "\"update\":2");
    record["canonical_json"] = json!(tampered);

    let record_path = write_input(&dir, "record.json", &record);
    let verify = bin()
        .args(["verify-plan", &record_path, "--strict"])
        .output()
        .unwrap();
    assert!(!verify.status.success());
    assert!(String::from_utf8_lossy(&verify.stdout).contains("Mismatch"));
}

#[test]
fn test_plan_hash_rejects_unordered_rows() {
    let mut plan = make_plan_input();
    let row = plan["rows"][0].clone();
    let mut second = row.clone();
    second["row_id"] = json!("row-000");
    plan["rows"] = json!([row, second]);
    plan["action_counts"]["update"] = json!(2);

    let output = run_with_stdin(&["plan-hash"], &plan.to_string());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("out of order"));
}

#[test]
fn test_pit_latest() {
    let tuples = json!([
        {"sys_updated_on": "2024-01-01 00:00:00", "sys_mod_count": 8, "event_time": "2024-01-01T00:00:00Z", "event_id": "evt-a"},
        {"sys_updated_on": "2024-01-01 00:00:00", "sys_mod_count": 7, "event_time": "2024-01-01T00:09:00Z", "event_id": "evt-z"}
    ]);
    let output = run_with_stdin(&["pit-latest"], &tuples.to_string());
    assert!(output.status.success());
    let latest: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(latest["event_id"], "evt-a");

    let output = run_with_stdin(&["pit-latest", "--all"], &tuples.to_string());
    let ordered: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ordered[0]["event_id"], "evt-z");
    assert_eq!(ordered[1]["event_id"], "evt-a");
}

#[test]
fn test_pit_latest_all_with_mixed_mod_counts() {
    let mut tuples = vec![
        json!({"sys_updated_on": "2024-01-01 00:00:00", "sys_mod_count": 7, "event_time": "2024-01-01T00:00:02Z", "event_id": "c"}),
        json!({"sys_updated_on": "2024-01-01 00:00:00", "event_time": "2024-01-01T00:00:01Z", "event_id": "b"}),
        json!({"sys_updated_on": "2024-01-01 00:00:00", "sys_mod_count": 8, "event_time": "2024-01-01T00:00:00Z", "event_id": "a"}),
    ];
    let output = run_with_stdin(&["pit-latest", "--all"], &Value::from(tuples.clone()).to_string());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let ordered: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<_> = ordered
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["event_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);

    let latest = run_with_stdin(&["pit-latest"], &Value::from(tuples.clone()).to_string());
    let latest: Value = serde_json::from_slice(&latest.stdout).unwrap();
    assert_eq!(latest["event_id"], "a");

    for i in 0..30u32 {
        let mut t = json!({
            "sys_updated_on": "2024-01-01 00:00:00",
            "event_time": format!("2024-01-01T00:00:{:02}Z", (i * 17) % 60),
            "event_id": format!("evt-{i:02}"),
        });
        if i % 2 == 0 {
            t["sys_mod_count"] = json!((i * 5) % 9);
        }
        tuples.push(t);
    }
    let output = run_with_stdin(&["pit-latest", "--all"], &Value::from(tuples.clone()).to_string());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let ordered: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(ordered.as_array().unwrap().len(), tuples.len());
}

#[test]
fn test_pit_latest_empty_input_fails() {
    let output = run_with_stdin(&["pit-latest"], "[]");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}

#[test]
fn test_replay_sort_and_validate() {
    let events = json!([
        make_audit_event("b", "rrs", "2024-01-01T00:00:01.000Z"),
        make_audit_event("a", "rrs", "2024-01-01T00:00:00.000Z"),
        make_audit_event("c", "acp", "2024-01-01T00:00:01.000Z")
    ]);

    let unsorted = run_with_stdin(&["replay-validate"], &events.to_string());
    assert!(!unsorted.status.success());
    assert!(String::from_utf8_lossy(&unsorted.stderr).contains("out of replay order"));

    let sorted = run_with_stdin(&["replay-sort", "--json"], &events.to_string());
    assert!(sorted.status.success());
    let sorted: Value = serde_json::from_slice(&sorted.stdout).unwrap();
    let ids: Vec<_> = sorted
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "c", "b"]);

    let valid = run_with_stdin(&["replay-validate", "--json"], &sorted.to_string());
    assert!(valid.status.success());
}

#[test]
fn test_replay_assemble_emits_versioned_batch() {
    let event = make_audit_event("a", "reg", "2024-01-01T00:00:00.000Z");
    let events = json!([event.clone(), event]);
    let output = run_with_stdin(&["replay-sort", "--assemble", "--json"], &events.to_string());
    assert!(output.status.success());
    let batch: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(batch["replay_order_version"], "audit-replay-order.v1");
    assert_eq!(batch["events"].as_array().unwrap().len(), 1);

    let check = run_with_stdin(&["replay-validate"], &batch.to_string());
    assert!(check.status.success());
    assert!(String::from_utf8_lossy(&check.stdout).contains("OK 1 events"));
}

#[test]
fn test_legacy_map_job_events() {
    let legacy = json!([{
        "event_id": "rrs-1",
        "event_type": "job_started",
        "occurred_at": "2024-05-01 10:00:00",
        "job_id": "job-1",
        "reason_code": "none",
        "details": {"resumed_from_pause": true}
    }]);
    let output = run_with_stdin(&["legacy-map", "--kind", "job", "--json"], &legacy.to_string());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let mapped: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(mapped[0]["lifecycle"], "resume");
    assert_eq!(mapped[0]["occurred_at"], "2024-05-01T10:00:00.000Z");
    assert!(mapped[0].get("reason_code").is_none());
}

#[test]
fn test_max_size_is_enforced() {
    let output = run_with_stdin(&["--max-size", "4", "canonicalize"], r#"{"a":1234}"#);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exceeds maximum"));
}
