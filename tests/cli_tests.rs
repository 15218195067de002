use assert_cmd::prelude::*;
use flatpak_cargo::SourceEntry;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

const REGISTRY_LOCK: &str = r#"
version = 3

[[package]]
name = "app"
version = "0.1.0"
dependencies = ["foo"]

[[package]]
name = "foo"
version = "1.2.3"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "abc123"
"#;

fn generator() -> Command {
    Command::cargo_bin("flatpak-cargo-generator").unwrap()
}

#[test]
fn test_help_command_succeeds() {
    generator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Generate flatpak-builder sources",
        ));
}

#[test]
fn test_version_command_succeeds() {
    generator()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flatpak-cargo-generator"));
}

#[test]
fn test_missing_lockfile() {
    generator()
        .arg("nonexistent.lock")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("lockfile does not exist"));
}

#[test]
fn test_missing_output_directory() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("Cargo.lock");
    std::fs::write(&lock_path, REGISTRY_LOCK).unwrap();
    let output = temp_dir.path().join("missing/sources.json");

    generator()
        .arg(&lock_path)
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("output directory does not exist"));
}

#[test]
fn test_registry_lockfile_writes_sources() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("Cargo.lock");
    let output = temp_dir.path().join("generated-sources.json");
    std::fs::write(&lock_path, REGISTRY_LOCK).unwrap();

    generator()
        .arg(&lock_path)
        .args(["-o", output.to_str().unwrap()])
        .args(["--cache-dir", temp_dir.path().join("cache").to_str().unwrap()])
        .assert()
        .success();

    let json = std::fs::read_to_string(&output).unwrap();
    assert!(json.starts_with("[\n    {"));
    let sources: Vec<SourceEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(
        sources[0],
        SourceEntry::archive(
            "https://static.crates.io/crates/foo/foo-1.2.3.crate",
            "abc123",
            "cargo/vendor/foo-1.2.3"
        )
    );
    let SourceEntry::Inline(config) = &sources[2] else {
        panic!("expected the cargo config last");
    };
    assert!(config.contents.contains("[source.crates-io]"));
}

#[test]
fn test_default_output_in_working_directory() {
    let temp_dir = tempdir().unwrap();
    std::fs::write(temp_dir.path().join("Cargo.lock"), REGISTRY_LOCK).unwrap();

    generator()
        .current_dir(temp_dir.path())
        .arg("Cargo.lock")
        .env("FLATPAK_CARGO_CACHE", temp_dir.path().join("cache"))
        .assert()
        .success();
    assert!(temp_dir.path().join("generated-sources.json").is_file());
}

#[test]
fn test_invalid_lockfile_leaves_output_untouched() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("Cargo.lock");
    let output = temp_dir.path().join("generated-sources.json");
    std::fs::write(&lock_path, "this is not [a lockfile").unwrap();
    std::fs::write(&output, "previous").unwrap();

    generator()
        .arg(&lock_path)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Failed to parse lockfile"));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
}

#[test]
fn test_git_source_without_commit_fails() {
    let temp_dir = tempdir().unwrap();
    let lock_path = temp_dir.path().join("Cargo.lock");
    let output = temp_dir.path().join("generated-sources.json");
    std::fs::write(
        &lock_path,
        r#"
[[package]]
name = "bar"
version = "0.1.0"
source = "git+https://github.com/foo/bar?branch=main"
"#,
    )
    .unwrap();

    generator()
        .arg(&lock_path)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("does not name a commit"));
    assert!(!output.exists());
}
