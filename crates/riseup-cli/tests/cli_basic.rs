//! Basic CLI E2E tests.
//!
//! Tests invoke the built `riseup` binary against a throwaway data
//! directory and verify outputs.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_riseup"))
        .args(args)
        .env("RISEUP_DATA_DIR", data_dir)
        .env_remove("RISEUP_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command and expect success.
fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    stdout
}

fn parse_json(json: &str) -> serde_json::Value {
    serde_json::from_str(json).expect("Failed to parse JSON output")
}

#[test]
fn test_fresh_data_dir_has_default_alarm() {
    let dir = tempfile::tempdir().unwrap();
    let alarms = parse_json(&run_cli_success(dir.path(), &["alarm", "list", "--json"]));
    let alarms = alarms.as_array().unwrap();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0]["label"], "Wake Up!");
    assert_eq!(alarms[0]["days"], serde_json::json!([1, 2, 3, 4, 5]));

    // Same id on the next run.
    let again = parse_json(&run_cli_success(dir.path(), &["alarm", "list", "--json"]));
    assert_eq!(again[0]["id"], alarms[0]["id"]);
}

#[test]
fn test_alarm_add_edit_toggle_delete() {
    let dir = tempfile::tempdir().unwrap();
    let added = parse_json(&run_cli_success(
        dir.path(),
        &[
            "alarm", "add", "--time", "06:30", "--days", "mon,wed", "--label", "Run",
            "--category", "exercise", "--difficulty", "medium",
        ],
    ));
    let id = added["id"].as_str().unwrap().to_string();
    assert_eq!(added["label"], "Run");
    assert_eq!(added["category"], "exercise");
    assert_eq!(added["difficulty"], "medium");

    let edited = parse_json(&run_cli_success(
        dir.path(),
        &["alarm", "edit", &id, "--label", "Long run", "--days", "weekends"],
    ));
    assert_eq!(edited["label"], "Long run");
    assert_eq!(edited["days"], serde_json::json!([0, 6]));

    let toggled = run_cli_success(dir.path(), &["alarm", "toggle", &id]);
    assert!(toggled.contains("disabled"));

    run_cli_success(dir.path(), &["alarm", "delete", &id]);
    let alarms = parse_json(&run_cli_success(dir.path(), &["alarm", "list", "--json"]));
    assert!(alarms.as_array().unwrap().iter().all(|a| a["id"] != id.as_str()));
}

#[test]
fn test_alarm_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["alarm", "add", "--time", "7 o'clock"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, _, code) = run_cli(dir.path(), &["alarm", "add", "--time", "07:00", "--days", "funday"]);
    assert_eq!(code, 1);

    let (_, _, code) = run_cli(dir.path(), &["alarm", "toggle", "no-such-id"]);
    assert_eq!(code, 1);
}

#[test]
fn test_alarm_next() {
    let dir = tempfile::tempdir().unwrap();
    let next = parse_json(&run_cli_success(dir.path(), &["alarm", "next"]));
    // The default weekday alarm always has an occurrence within a week.
    assert!(next["at"].is_string());
    assert!(next["countdown"].as_str().unwrap().starts_with("in "));

    let alarms = parse_json(&run_cli_success(dir.path(), &["alarm", "list", "--json"]));
    let id = alarms[0]["id"].as_str().unwrap();
    run_cli_success(dir.path(), &["alarm", "toggle", id]);
    let next = parse_json(&run_cli_success(dir.path(), &["alarm", "next"]));
    assert!(next.is_null());
}

#[test]
fn test_config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(run_cli_success(dir.path(), &["config", "get", "theme"]).trim(), "default");

    run_cli_success(dir.path(), &["config", "set", "theme", "ocean"]);
    run_cli_success(dir.path(), &["config", "set", "snooze_duration_min", "5"]);
    assert_eq!(run_cli_success(dir.path(), &["config", "get", "theme"]).trim(), "ocean");

    let list = parse_json(&run_cli_success(dir.path(), &["config", "list", "--json"]));
    assert_eq!(list["snooze_duration_min"], 5);

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "night_mode", "sometimes"]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["config", "get", "missing_key"]);
    assert_eq!(code, 1);

    run_cli_success(dir.path(), &["config", "reset"]);
    assert_eq!(run_cli_success(dir.path(), &["config", "get", "theme"]).trim(), "default");
}

#[test]
fn test_new_alarm_uses_configured_snooze() {
    let dir = tempfile::tempdir().unwrap();
    run_cli_success(dir.path(), &["config", "set", "snooze_enabled", "true"]);
    let added = parse_json(&run_cli_success(dir.path(), &["alarm", "add", "--time", "08:15"]));
    assert_eq!(added["snooze_enabled"], true);
}

#[test]
fn test_stats_show_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let stats = parse_json(&run_cli_success(dir.path(), &["stats", "show", "--json"]));
    assert_eq!(stats["stats"]["total_alarms"], 0);
    assert_eq!(stats["streak_status"], "No streak");
    assert_eq!(stats["weekly"]["percentage"], 0);

    run_cli_success(dir.path(), &["stats", "reset"]);
}

#[test]
fn test_watch_prints_json_lines_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_riseup"))
        .arg("watch")
        .env("RISEUP_DATA_DIR", dir.path())
        .env_remove("RISEUP_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch");

    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, "fg").unwrap();
        writeln!(stdin, "status").unwrap();
        writeln!(stdin, "quit").unwrap();
    }
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let types: Vec<String> = stdout
        .lines()
        .map(|line| parse_json(line)["type"].as_str().unwrap().to_string())
        .collect();
    assert!(types.contains(&"View".to_string()), "got {types:?}");
    assert!(types.contains(&"StateSnapshot".to_string()), "got {types:?}");
}

#[test]
fn test_watch_picks_up_alarm_added_by_another_process() {
    let dir = tempfile::tempdir().unwrap();
    let alarms = parse_json(&run_cli_success(dir.path(), &["alarm", "list", "--json"]));
    let default_id = alarms[0]["id"].as_str().unwrap().to_string();
    run_cli_success(dir.path(), &["alarm", "toggle", &default_id]);

    let mut child = Command::new(env!("CARGO_BIN_EXE_riseup"))
        .arg("watch")
        .env("RISEUP_DATA_DIR", dir.path())
        .env_remove("RISEUP_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to start watch");
    let mut stdin = child.stdin.take().unwrap();
    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();

    let mut next_line = move || parse_json(&lines.next().expect("watch exited early").unwrap());

    while next_line()["type"] != "StateSnapshot" {}

    let added = parse_json(&run_cli_success(
        dir.path(),
        &["alarm", "add", "--time", "12:00", "--days", "daily", "--label", "Lunch"],
    ));
    writeln!(stdin, "fg").unwrap();
    stdin.flush().unwrap();

    loop {
        let line = next_line();
        if line["type"] == "NextAlarmChanged" && line["alarm_id"] == added["id"] {
            break;
        }
    }

    writeln!(stdin, "quit").unwrap();
    drop(stdin);
    assert_eq!(child.wait().unwrap().code(), Some(0));
}
