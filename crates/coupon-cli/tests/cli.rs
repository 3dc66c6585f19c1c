use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run_coupon(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_coupon"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| panic!("bad JSON {stdout:?}: {e}"))
}

fn is_code(code: &str, prefix: &str, date: &str) -> bool {
    let Some(rest) = code.strip_prefix(prefix) else {
        return false;
    };
    let Some(rest) = rest.strip_prefix(date) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 7
        && bytes[0] == b'-'
        && bytes[1..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4..].iter().all(u8::is_ascii_digit)
}

// === handle ===

#[test]
fn handle_single_request_from_argument() {
    let output = run_coupon(&[
        "--date",
        "2025-04-05",
        "handle",
        r#"{"action":"generate_single","prefix":"CP"}"#,
    ]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["success"], true);
    let code = json["code"].as_str().unwrap();
    assert!(is_code(code, "CP", "0504"), "got: {}", code);
}

#[test]
fn handle_batch_request_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_coupon"))
        .args(["--date", "2025-04-05", "handle"])
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(br#"{"action":"generate_multiple","count":5,"prefix":"QR"}"#)
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["count"], 5);
    let codes: HashSet<&str> = json["codes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 5);
    assert!(codes.iter().all(|c| is_code(c, "QR", "0504")));
}

#[test]
fn handle_unknown_action_prints_failure() {
    let output = run_coupon(&["handle", r#"{"action":"foo"}"#]);
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Unknown action: foo");
}

#[test]
fn handle_malformed_json_prints_failure() {
    let output = run_coupon(&["handle", "{bad json"]);
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("JSON"));
}

#[test]
fn handle_keeps_cyrillic_unescaped() {
    let output = run_coupon(&["handle", "{}"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Код успешно сгенерирован"), "stdout: {}", stdout);
}

#[test]
fn debug_logs_stay_off_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_coupon"))
        .args(["handle", r#"{"action":"generate_multiple","count":2}"#])
        .env("RUST_LOG", "debug")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["count"], 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("generated coupon"), "stderr: {}", stderr);
}

// === generate ===

#[test]
fn generate_single_with_prefix() {
    let output = run_coupon(&["--date", "2024-12-31", "generate", "--prefix", "SALE"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert!(is_code(json["code"].as_str().unwrap(), "SALE", "3112"));
}

#[test]
fn generate_batch_with_count() {
    let output = run_coupon(&["generate", "--count", "3"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["count"], 3);
    assert_eq!(json["message"], "Успешно сгенерировано 3 кодов");
}

#[test]
fn generate_negative_count_is_empty() {
    let output = run_coupon(&["generate", "--count", "-2"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["count"], 0);
}

#[test]
fn rejects_malformed_date() {
    let output = run_coupon(&["--date", "05.04.2025", "generate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("YYYY-MM-DD"), "stderr: {}", stderr);
}

// === validate / parse ===

#[test]
fn validate_reports_valid_and_invalid() {
    let output = run_coupon(&["validate", "CP2106-ABC123"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "valid");

    let output = run_coupon(&["validate", "CP2106-abc123"]);
    assert!(!output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "invalid");

    let output = run_coupon(&["validate", "QR2106-ABC123", "--prefix", "QR"]);
    assert!(output.status.success());
}

#[test]
fn parse_prints_parts() {
    let output = run_coupon(&["parse", "QR0504-XYZ789"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["prefix"], "QR");
    assert_eq!(json["date"], "0504");
    assert_eq!(json["letters"], "XYZ");
    assert_eq!(json["numbers"], "789");
    assert_eq!(json["full_code"], "QR0504-XYZ789");
}

#[test]
fn parse_without_hyphen_fails() {
    let output = run_coupon(&["parse", "QR0504XYZ789"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("hyphen"), "stderr: {}", stderr);
}

// === demo ===

#[test]
fn demo_runs_both_sample_requests() {
    let output = run_coupon(&["--date", "2025-04-05", "demo"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Результат для Salebot:"));
    assert!(stdout.contains("Результат генерации нескольких кодов:"));
    assert!(stdout.contains("\"code\":\"CP0504-"), "stdout: {}", stdout);
    assert!(stdout.contains("\"count\":5"), "stdout: {}", stdout);
}

// === config ===

#[test]
fn config_file_sets_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("coupon.toml");
    fs::write(
        &path,
        "default_prefix = \"VIP\"\ndefault_action = \"generate_multiple\"\ndefault_count = 2\n",
    )
    .unwrap();
    let path = path.display().to_string();

    let output = run_coupon(&["--config", &path, "--date", "2025-04-05", "handle", "{}"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["count"], 2);
    assert!(json["codes"]
        .as_array()
        .unwrap()
        .iter()
        .all(|c| is_code(c.as_str().unwrap(), "VIP", "0504")));

    let output = run_coupon(&["--config", &path, "validate", "VIP0504-ABC123"]);
    assert!(output.status.success());
}

#[test]
fn missing_config_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing.toml").display().to_string();

    let output = run_coupon(&["--config", &path, "demo"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: IO error"), "stderr: {}", stderr);
}
