//! Integration tests for the CLI binary.
//!
//! Verifies that the `lvx` binary responds to basic flags and drives a
//! full issue/confirm flow against a snapshot file.
//!
//! This test is registered as a [[test]] in the ledger-verifications-cli
//! crate so that CARGO_BIN_EXE_lvx is available.

use std::path::Path;
use std::process::{Command, Output};

/// Get a Command pointing to the `lvx` binary.
fn lvx_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lvx"))
}

/// Run `lvx --ledger <ledger> <args>` and require success.
fn lvx_ok(ledger: &Path, args: &[&str]) -> String {
    let output = lvx(ledger, args);
    assert!(
        output.status.success(),
        "lvx {args:?} failed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn lvx(ledger: &Path, args: &[&str]) -> Output {
    lvx_binary()
        .arg("--ledger")
        .arg(ledger)
        .args(args)
        .output()
        .expect("failed to execute lvx")
}

/// Create an account with an identity and return its address.
fn new_account(ledger: &Path) -> String {
    let address = lvx_ok(ledger, &["account", "new"]).trim().to_string();
    assert!(address.starts_with("0x"), "unexpected address: {address}");
    lvx_ok(ledger, &["identity", "create", "--account", &address]);
    address
}

fn field<'a>(stdout: &'a str, label: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
        .unwrap_or_else(|| panic!("no '{label}' line in: {stdout}"))
}

#[test]
fn cli_responds_to_help() {
    let output = lvx_binary()
        .arg("--help")
        .output()
        .expect("failed to execute lvx --help");

    assert!(
        output.status.success(),
        "lvx --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage") && stdout.contains("issue"),
        "lvx --help output should list subcommands, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = lvx_binary()
        .arg("--version")
        .output()
        .expect("failed to execute lvx --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("lvx") && stdout.contains("0.3"),
        "lvx --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = lvx_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute lvx");

    assert!(
        !output.status.success(),
        "lvx should fail on an unknown flag"
    );
}

#[test]
fn cli_issue_confirm_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");

    let issuer = new_account(&ledger);
    let subject = new_account(&ledger);
    assert!(ledger.exists(), "mutating commands should save the ledger");

    let issued = lvx_ok(
        &ledger,
        &[
            "issue",
            "--issuer",
            &issuer,
            "--subject",
            &subject,
            "--topic",
            "/kyc",
            "--expires-in",
            "30d",
            "--payload",
            r#"{"level":2}"#,
        ],
    );
    let id = field(&issued, "ID:").to_string();

    let listed = lvx_ok(&ledger, &["list", "--subject", &subject, "--topic", "/kyc"]);
    assert!(listed.contains(&id));
    assert!(listed.contains("issued"));

    lvx_ok(
        &ledger,
        &[
            "confirm", "--from", &subject, "--subject", &subject, "--topic", "/kyc", "--id", &id,
        ],
    );

    let status = lvx_ok(&ledger, &["status", "--subject", &subject, "--topic", "/kyc"]);
    assert_eq!(field(&status, "Status:"), "confirmed");
    assert_eq!(field(&status, "Level:"), "Green");

    let path = lvx_ok(&ledger, &["path", "--subject", &subject, "--topic", "/kyc"]);
    assert_eq!(field(&path, "Reaches root:"), "true");
    assert_eq!(field(&path, "Intact:"), "true");
}

#[test]
fn cli_reports_errors_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    let stranger = lvx_ok(&ledger, &["account", "new"]).trim().to_string();
    let subject = new_account(&ledger);

    // The issuer has no identity, so the relay has no executor.
    let output = lvx(
        &ledger,
        &[
            "issue", "--issuer", &stranger, "--subject", &subject, "--topic", "/kyc",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error:"), "got: {stderr}");
}

#[test]
fn cli_rejects_malformed_topic() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    let subject = new_account(&ledger);

    let output = lvx(&ledger, &["list", "--subject", &subject, "--topic", "kyc//x"]);
    assert!(!output.status.success());
}
