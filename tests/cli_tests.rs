//! E2E tests for jurischeck CLI

#![allow(deprecated)] // cargo_bin deprecation - will update when assert_cmd stabilizes replacement

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const CITATION_TEXT: &str =
    "Selon Cass. crim., 12 janvier 2023, n° 22-81.234, le recel est constitué.\n\
     Voir aussi CE, 3 mars 2021, n° 437125.";

fn jurischeck() -> Command {
    let mut cmd = Command::cargo_bin("jurischeck").unwrap();
    cmd.env_remove("JUDILIBRE_API_KEY")
        .env_remove("LEGIFRANCE_CLIENT_ID")
        .env_remove("LEGIFRANCE_CLIENT_SECRET")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    jurischeck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_version() {
    jurischeck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jurischeck"));
}

#[test]
fn test_verify_help() {
    jurischeck()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--stdin"))
        .stdout(predicate::str::contains("--judilibre-api-key"));
}

#[test]
fn test_scan_no_args() {
    jurischeck()
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_scan_file_not_found() {
    jurischeck()
        .args(["scan", "nonexistent.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_scan_no_citations() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("plain.txt");
    fs::write(&file_path, "Aucune jurisprudence citée ici.").unwrap();

    jurischeck()
        .args(["scan", file_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No citations found"));
}

#[test]
fn test_scan_file() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("memo.txt");
    fs::write(&file_path, CITATION_TEXT).unwrap();

    jurischeck()
        .args(["scan", file_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total":2"#))
        .stdout(predicate::str::contains(r#""jurisdiction":"Cass. crim.""#))
        .stdout(predicate::str::contains(r#""docket":"22-81.234""#))
        .stdout(predicate::str::contains(r#""ai_proposed":true"#));
}

#[test]
fn test_scan_stdin() {
    jurischeck()
        .args(["scan", "--stdin"])
        .write_stdin(CITATION_TEXT)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""docket":"437125""#));
}

#[test]
fn test_verify_without_credentials_fails_before_reading_input() {
    jurischeck()
        .args(["verify", "nonexistent.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("api_key"));
}

#[test]
fn test_verify_invalid_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("registries.yaml");
    fs::write(&config_path, "batch_size: [not, a, number]").unwrap();

    jurischeck()
        .args(["verify", "--stdin", "--config", config_path.to_str().unwrap()])
        .write_stdin(CITATION_TEXT)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_verify_with_registries_disabled() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("registries.yaml");
    fs::write(
        &config_path,
        "registries:\n  - kind: judilibre\n    enabled: false\n  - kind: legifrance\n    enabled: false\n",
    )
    .unwrap();

    jurischeck()
        .args(["verify", "--stdin", "--config", config_path.to_str().unwrap()])
        .write_stdin(CITATION_TEXT)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total":2"#))
        .stdout(predicate::str::contains(r#""verified":0"#))
        .stdout(predicate::str::contains(r#""status":"not_found""#))
        .stderr(predicate::str::contains("2/2"));
}

#[test]
fn test_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("registries.yaml");

    jurischeck()
        .args(["init", "--output", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""file":"#));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("kind: judilibre"));
    assert!(content.contains("kind: legifrance"));
    assert!(content.contains("https://api.piste.gouv.fr/cassation/judilibre/v1.0"));
}

#[test]
fn test_init_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("registries.yaml");
    fs::write(&config_path, "batch_size: 2\n").unwrap();

    jurischeck()
        .args(["init", "--output", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("file_exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "batch_size: 2\n");

    jurischeck()
        .args(["init", "--output", config_path.to_str().unwrap(), "--force"])
        .assert()
        .success();
    assert!(fs::read_to_string(&config_path).unwrap().contains("kind: judilibre"));
}
