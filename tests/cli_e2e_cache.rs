//! End-to-end tests for the `cache` command.
//!
//! These tests invoke the actual CLI binary and validate cache command behavior
//! from a user's perspective.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

/// Test that cache --help flag shows help information
#[test]
fn test_cache_help() {
    let mut cmd = cargo_bin_cmd!("gitpin");

    cmd.arg("cache")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Inspect the shared object cache"));
}

/// `cache root` honors the environment override.
#[test]
fn test_cache_root_from_env() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("gitpin");
    cmd.arg("cache")
        .arg("root")
        .env("GITPIN_CACHE_DIR", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(temp.path().to_string_lossy().as_ref()));
}

/// `cache path` is deterministic and lives under `repos/`.
#[test]
fn test_cache_path_is_stable() {
    let temp = assert_fs::TempDir::new().unwrap();
    let run = || {
        let output = cargo_bin_cmd!("gitpin")
            .arg("cache")
            .arg("--cache-dir")
            .arg(temp.path())
            .arg("path")
            .arg("https://github.com/fmtlib/fmt.git")
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    let first = run();
    assert_eq!(first, run());
    let path = std::path::PathBuf::from(first.trim());
    assert!(path.starts_with(temp.path().join("repos")));
    assert_eq!(path.file_name().unwrap().len(), 64);
}

/// Distinct URLs get distinct mirrors, even when they name the same project.
#[test]
fn test_cache_path_differs_per_url() {
    let temp = assert_fs::TempDir::new().unwrap();
    let path_of = |url: &str| {
        let output = cargo_bin_cmd!("gitpin")
            .args(["cache", "path", url])
            .env("GITPIN_CACHE_DIR", temp.path())
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap()
    };

    assert_ne!(
        path_of("https://github.com/fmtlib/fmt.git"),
        path_of("git@github.com:fmtlib/fmt.git")
    );
}

/// Listing an empty cache is not an error.
#[test]
fn test_cache_list_empty() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("gitpin");
    cmd.args(["cache", "list"])
        .env("GITPIN_CACHE_DIR", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No mirrors found"));
}

/// JSON listing of an empty cache is an empty array.
#[test]
fn test_cache_list_empty_json() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("gitpin");
    cmd.args(["cache", "list", "--json"])
        .env("GITPIN_CACHE_DIR", temp.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}
