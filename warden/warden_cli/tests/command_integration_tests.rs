use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn warden() -> Command {
    Command::cargo_bin("warden").unwrap()
}

#[test]
fn test_categories_lists_catalogue() {
    warden()
        .arg("categories")
        .assert()
        .success()
        .stdout(predicate::str::contains("location-when-in-use"))
        .stdout(predicate::str::contains("8250"))
        .stdout(predicate::str::contains("needs-config"));
}

#[test]
fn test_categories_respects_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("warden.toml");
    fs::write(&config, "categories = [\"microphone\", 8200]\n").unwrap();

    let output = warden()
        .args(["--config", config.to_str().unwrap(), "categories", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let codes: Vec<u64> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["code"].as_u64().unwrap())
        .collect();
    assert_eq!(codes, vec![4000, 8200]);
}

#[test]
fn test_run_reports_each_step() {
    warden()
        .args([
            "run",
            "location-when-in-use",
            "microphone",
            "--outcome",
            "microphone=denied",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/2] requesting location-when-in-use"))
        .stdout(predicate::str::contains("microphone: not_determined -> denied"))
        .stdout(predicate::str::contains("1 of 2 authorized"));
}

#[test]
fn test_run_json_events() {
    let output = warden()
        .args(["run", "events", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let events: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| e["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["step_started", "transitioned", "step_completed", "sequence_finished"]
    );
    assert_eq!(events[3]["outcome"], "completed");
    assert_eq!(events[3]["steps"][0]["status"], "authorized");
}

#[test]
fn test_run_hang_times_out() {
    warden()
        .args([
            "run",
            "health",
            "reminders",
            "--outcome",
            "health=hang",
            "--timeout-ms",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("timed out after 100ms"))
        .stdout(predicate::str::contains("reminders: not_determined -> authorized"))
        .stdout(predicate::str::contains(
            "denied (Platform call for health timed out after 100ms)",
        ));
}

#[test]
fn test_run_with_account_option() {
    warden()
        .args([
            "run",
            "social-facebook",
            "--account-option",
            "social-facebook:app_id=42",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 authorized"));
}

#[test]
fn test_invalid_sequences_fail() {
    warden()
        .args(["run", "microphone", "4000"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid sequence"));

    warden()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid sequence"));

    warden()
        .args(["run", "teleport"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown category"));
}

#[test]
fn test_bad_config_fails() {
    warden()
        .args(["--config", "/definitely/not/here.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));

    warden()
        .args(["run", "events", "--outcome", "events=perhaps"])
        .assert()
        .failure();
}

#[test]
fn test_store_round_trip() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("statuses.json");
    let store_arg = store.to_str().unwrap();

    warden()
        .args(["run", "address-book", "--outcome", "address-book=restricted"])
        .args(["--store", store_arg])
        .assert()
        .success();

    let contents = fs::read_to_string(&store).unwrap();
    assert!(contents.contains("\"8100\": \"restricted\""));

    warden()
        .args(["status", "--store", store_arg])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"8100\s+address-book\s+restricted").unwrap());
}
