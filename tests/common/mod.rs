//! Shared fixtures for tests that drive the real `git` binary.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

pub const BUILD_FILE: &str = "CMakeLists.txt";

/// True when a `git` executable can be spawned.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Runs git in `dir` and returns trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test User",
            "-c",
            "user.email=test@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// An upstream repository that packages are pinned from.
pub struct SourceRepo {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl SourceRepo {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("upstream");
        fs::create_dir_all(&path).expect("create upstream");
        git(&path, &["init", "--quiet"]);
        // Pinning fetches by commit id; ancestry queries use filtered fetches.
        git(&path, &["config", "uploadpack.allowAnySHA1InWant", "true"]);
        git(&path, &["config", "uploadpack.allowFilter", "true"]);
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Writes `files`, commits them and returns the new commit id.
    pub fn commit(&self, message: &str, files: &[(&str, &str)]) -> String {
        for (name, content) in files {
            let file = self.path.join(name);
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).expect("create parent");
            }
            fs::write(file, content).expect("write file");
        }
        git(&self.path, &["add", "-A"]);
        git(&self.path, &["commit", "--quiet", "--allow-empty", "-m", message]);
        git(&self.path, &["rev-parse", "HEAD"])
    }
}

/// Relative path -> contents for every file under `dir`.
pub fn snapshot_tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).expect("under dir").to_path_buf();
            (rel, fs::read(e.path()).expect("read file"))
        })
        .collect()
}

/// Skips the calling test when git is missing.
#[allow(unused_macros)]
macro_rules! require_git {
    () => {
        if !common::git_available() {
            eprintln!("git not available; skipping");
            return;
        }
    };
}
