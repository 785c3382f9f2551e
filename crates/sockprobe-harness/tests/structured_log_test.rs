//! Integration test: structured JSONL run evidence.
//!
//! Run: cargo test -p sockprobe-harness --test structured_log_test

use std::time::Duration;

use sockprobe_core::{AddressFamily, Completion, Role, TestSpec};
use sockprobe_harness::structured_log::{
    EVENT_RUN_START, EVENT_RUN_VERDICT, LogEmitter, LogEntry, LogLevel, Outcome,
    validate_log_file, validate_log_line,
};

fn temp_log(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("sockprobe-log-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn emitter_generates_sequential_trace_ids() {
    let mut emitter = LogEmitter::to_buffer("run-42");
    let first = emitter.emit(LogLevel::Info, EVENT_RUN_START).unwrap();
    let second = emitter.emit(LogLevel::Info, EVENT_RUN_VERDICT).unwrap();
    assert_eq!(first.trace_id, "run-42::001");
    assert_eq!(second.trace_id, "run-42::002");
    assert_eq!(first.run_id.as_deref(), Some("run-42"));
}

#[test]
fn run_verdict_entry_carries_run_fields() {
    let spec = TestSpec::sustained(
        Role::Initiator,
        AddressFamily::V6,
        "::1",
        9000,
        Completion::Iterations(100),
        Duration::from_millis(50),
    );
    let mut emitter = LogEmitter::to_buffer("run-7");
    let entry = emitter
        .entry(LogLevel::Error, EVENT_RUN_VERDICT)
        .with_spec(&spec)
        .with_outcome(Outcome::Fail)
        .with_errno(104)
        .with_exit_code(1)
        .with_bytes(2178, 2156)
        .with_duration_ms(5012);
    emitter.emit_entry(entry).unwrap();

    let lines = emitter.buffered_lines().unwrap();
    assert_eq!(lines.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["role"], "client");
    assert_eq!(parsed["family"], "ipv6");
    assert_eq!(parsed["transfer"], "sustained");
    assert_eq!(parsed["outcome"], "fail");
    assert_eq!(parsed["errno"], 104);
    assert_eq!(parsed["bytes_written"], 2178);
    assert_eq!(parsed["bytes_read"], 2156);
    assert_eq!(parsed["duration_ms"], 5012);
    assert!(validate_log_line(&lines[0], 1).is_ok());
}

#[test]
fn file_emitter_output_validates() {
    let path = temp_log("valid.jsonl");
    {
        let mut emitter = LogEmitter::to_file(&path, "run-file").unwrap();
        emitter.emit(LogLevel::Info, EVENT_RUN_START).unwrap();
        let verdict = emitter
            .entry(LogLevel::Info, EVENT_RUN_VERDICT)
            .with_outcome(Outcome::Pass);
        emitter.emit_entry(verdict).unwrap();
        emitter.flush().unwrap();
    }
    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 2);
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn file_emitter_appends_across_invocations() {
    let path = temp_log("append.jsonl");
    for _ in 0..2 {
        let mut emitter = LogEmitter::to_file(&path, "run-append").unwrap();
        emitter.emit(LogLevel::Info, EVENT_RUN_START).unwrap();
        emitter.flush().unwrap();
    }
    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 2);
    assert!(errors.is_empty());
}

#[test]
fn validator_reports_every_bad_field() {
    let entry = LogEntry::new("no-separator", LogLevel::Info, EVENT_RUN_START);
    let mut value = serde_json::to_value(&entry).unwrap();
    value["role"] = serde_json::json!("peer");
    value["family"] = serde_json::json!("ipv5");
    let errors = validate_log_line(&value.to_string(), 9).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"role"));
    assert!(fields.contains(&"family"));
    assert!(fields.contains(&"trace_id"));
    assert!(errors.iter().all(|e| e.line_number == 9));
}

#[test]
fn validator_rejects_non_objects_and_bad_json() {
    assert_eq!(validate_log_line("[1,2]", 1).unwrap_err()[0].field, "<root>");
    assert_eq!(validate_log_line("{", 1).unwrap_err()[0].field, "<json>");
}
