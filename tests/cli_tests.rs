//! Integration tests for the command line: config validation, display and
//! generation.

use std::io::Write;
use tempfile::NamedTempFile;

/// Helper to get the binary path
fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_eureka-exporter"))
}

const VALID: &str = r#"
port: 9109
metadata:
  - zone
eurekas:
  - name: prod
    urls: http://eureka-1:8761, http://eureka-2:8761
    pullInterval: 15s
    security:
      basic:
        user: admin
        password: hunter2
"#;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

fn run(args: &[&str]) -> (bool, String, String) {
    let output = std::process::Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn test_check_config_accepts_valid_file() {
    let file = config_file(VALID);
    let path = file.path().to_str().unwrap();

    let (ok, stdout, stderr) = run(&["-c", path, "--check-config"]);

    assert!(ok, "stdout: '{}', stderr: '{}'", stdout, stderr);
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn test_check_config_rejects_empty_registry_list() {
    let file = config_file("eurekas: []\n");
    let path = file.path().to_str().unwrap();

    let (ok, stdout, stderr) = run(&["-c", path, "--check-config"]);

    assert!(!ok);
    assert!(
        stderr.contains("eureka instance config is empty"),
        "Expected error about empty config, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_check_config_rejects_missing_name() {
    let file = config_file("eurekas:\n  - urls: http://eureka:8761\n");
    let path = file.path().to_str().unwrap();

    let (ok, _, stderr) = run(&["-c", path, "--check-config"]);

    assert!(!ok);
    assert!(stderr.contains("urls/name can not be empty"), "stderr: '{}'", stderr);
}

#[test]
fn test_missing_config_file() {
    let (ok, _, stderr) = run(&["-c", "/nonexistent/eureka-exporter.yaml", "--check-config"]);

    assert!(!ok);
    assert!(stderr.contains("failed to read"), "stderr: '{}'", stderr);
}

#[test]
fn test_tls_enabled_without_paths() {
    let file = config_file(VALID);
    let path = file.path().to_str().unwrap();

    let (ok, stdout, stderr) = run(&["-c", path, "--enable-tls", "--check-config"]);

    assert!(!ok);
    assert!(
        stderr.contains("TLS is enabled but neither tls_cert_path nor tls_key_path are set"),
        "Expected error about missing TLS paths, got stdout: '{}', stderr: '{}'",
        stdout,
        stderr
    );
}

#[test]
fn test_tls_enabled_with_missing_cert_file() {
    let file = config_file(VALID);
    let path = file.path().to_str().unwrap();

    let (ok, _, stderr) = run(&[
        "-c",
        path,
        "--enable-tls",
        "--tls-cert",
        "/nonexistent/cert.pem",
        "--tls-key",
        "/nonexistent/key.pem",
        "--check-config",
    ]);

    assert!(!ok);
    assert!(
        stderr.contains("TLS certificate file not found"),
        "stderr: '{}'",
        stderr
    );
}

#[test]
fn test_show_config_redacts_passwords() {
    let file = config_file(VALID);
    let path = file.path().to_str().unwrap();

    let (ok, stdout, stderr) = run(&["-c", path, "--port", "9300", "--show-config"]);

    assert!(ok, "stderr: '{}'", stderr);
    assert!(stdout.contains("admin"));
    assert!(!stdout.contains("hunter2"));
    assert!(stdout.contains("9300"), "CLI port must win: {}", stdout);
}

#[test]
fn test_show_config_as_json() {
    let file = config_file(VALID);
    let path = file.path().to_str().unwrap();

    let (ok, stdout, _) = run(&["-c", path, "--show-config", "--config-format", "json"]);

    assert!(ok);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value["eurekas"][0]["name"], "prod");
    assert_eq!(value["eurekas"][0]["pullInterval"], "15s");
}

#[test]
fn test_config_subcommand_writes_loadable_file() {
    let (ok, stdout, _) = run(&["config", "-o", "-", "--commented"]);
    assert!(ok);
    assert!(stdout.starts_with("# Eureka Exporter Configuration"));

    let file = config_file(&stdout);
    let path = file.path().to_str().unwrap();
    let (ok, _, stderr) = run(&["-c", path, "--check-config"]);
    assert!(ok, "generated config must validate: {}", stderr);
}
