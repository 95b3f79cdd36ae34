//! # Repository Object Cache
//!
//! A shared, append-only store of bare mirrors, one per distinct remote URL,
//! located at `<root>/repos/<sha256(url)>`. Packages realized in FULL mode pull
//! their objects from here instead of the network, and the ancestry oracle runs
//! its DAG queries against it.
//!
//! Every commit brought into a mirror is pinned under `refs/pins/<commit>` and
//! automatic gc is disabled at creation, so objects are never pruned. Mutations
//! of a mirror hold its advisory lock (see [`crate::lock`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::lock::{self, LockGuard};

/// Name of the remote that points a FULL checkout at its mirror.
pub const CACHE_REMOTE: &str = "cache";

/// Pure mapping from a repository URL to its mirror directory.
pub fn mirror_path(root: &Path, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    root.join("repos").join(hex::encode(digest))
}

/// Ref under which a fetched commit is kept reachable in a mirror.
pub fn pin_ref(commit: &str) -> String {
    format!("refs/pins/{}", commit)
}

/// Outcome of inspecting a commit's object closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    /// The commit and everything reachable from it are present.
    Complete,
    /// The commit object is present but some reachable objects are not.
    Partial,
    /// The commit object itself is absent.
    Absent,
}

/// One initialized mirror found under the cache root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorEntry {
    pub path: PathBuf,
    /// `remote.origin.url`, if the mirror still records one.
    pub url: Option<String>,
    /// Number of commits pinned under `refs/pins/`.
    pub pinned: usize,
}

#[derive(Clone)]
pub struct ObjectCache {
    root: PathBuf,
    git: Arc<dyn GitRunner>,
}

impl ObjectCache {
    /// Relative roots are anchored at the current directory.
    pub fn new(root: PathBuf, git: Arc<dyn GitRunner>) -> Self {
        Self {
            root: crate::defaults::absolutize(root),
            git,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn runner(&self) -> &dyn GitRunner {
        self.git.as_ref()
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        mirror_path(&self.root, url)
    }

    fn lock(&self, path: &Path) -> Result<LockGuard> {
        lock::acquire(&lock::lock_path_for(path))
    }

    fn is_initialized(path: &Path) -> bool {
        path.join("HEAD").is_file()
    }

    /// Creates the bare mirror for `url` at `path` unless it already exists.
    ///
    /// The mirror is assembled in a scratch directory and moved into place, so
    /// an interrupted run never leaves a half-initialized entry behind.
    pub fn ensure_initialized(&self, url: &str, path: &Path) -> Result<()> {
        if Self::is_initialized(path) {
            return Ok(());
        }
        let _guard = self.lock(path)?;
        if Self::is_initialized(path) {
            return Ok(());
        }

        let parent = path.parent().ok_or_else(|| Error::Metadata {
            path: path.to_path_buf(),
            message: "mirror path has no parent directory".to_string(),
        })?;
        fs::create_dir_all(parent)?;

        info!("Creating mirror for {} at {}", url, path.display());
        let scratch = tempfile::Builder::new()
            .prefix(".init-")
            .tempdir_in(parent)?;
        self.git.run_checked(scratch.path(), &["init", "--bare", "--quiet"])?;
        self.git
            .run_checked(scratch.path(), &["config", "gc.auto", "0"])?;
        self.git
            .run_checked(scratch.path(), &["remote", "add", "origin", url])?;

        if path.exists() {
            // Leftover without HEAD from an older, interrupted layout.
            fs::remove_dir_all(path)?;
        }
        fs::rename(scratch.path(), path)?;
        Ok(())
    }

    /// Every initialized mirror under the root, sorted by path.
    pub fn entries(&self) -> Result<Vec<MirrorEntry>> {
        let repos = self.root.join("repos");
        if !repos.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&repos)? {
            let path = dir_entry?.path();
            let is_mirror_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.len() == 64 && n.chars().all(|c| c.is_ascii_hexdigit()));
            if !is_mirror_name || !Self::is_initialized(&path) {
                continue;
            }
            let url = self
                .git
                .run_expecting(&path, &["config", "--get", "remote.origin.url"], &[0, 1])?;
            let url = url
                .success()
                .then(|| url.stdout.trim().to_string())
                .filter(|u| !u.is_empty());
            let pins = self.git.run_checked(
                &path,
                &["for-each-ref", "--format=%(refname)", "refs/pins/"],
            )?;
            entries.push(MirrorEntry {
                pinned: pins.stdout.lines().filter(|l| !l.trim().is_empty()).count(),
                url,
                path,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Reports whether `commit` and its full object closure are in `path`.
    pub fn closure(&self, path: &Path, commit: &str) -> Result<Closure> {
        let output = self.git.run(
            path,
            &["rev-list", "--objects", "--missing=print", commit, "--"],
        )?;
        if !output.success() {
            return Ok(Closure::Absent);
        }
        if output.stdout.lines().any(|line| line.starts_with('?')) {
            Ok(Closure::Partial)
        } else {
            Ok(Closure::Complete)
        }
    }

    /// Makes sure `commit` and everything reachable from it are present.
    ///
    /// A populated mirror only pays for the object listing. Fetches never use
    /// an object filter, even when the mirror has earlier been filled by the
    /// tree-less fetches of the ancestry oracle.
    pub fn ensure_has_commit(&self, path: &Path, commit: &str) -> Result<()> {
        if self.closure(path, commit)? == Closure::Complete {
            return Ok(());
        }
        let _guard = self.lock(path)?;
        let refspec = format!("+{}:{}", commit, pin_ref(commit));

        match self.closure(path, commit)? {
            Closure::Complete => return Ok(()),
            Closure::Absent => {
                info!("Fetching {} into {}", commit, path.display());
                self.git.run_checked(
                    path,
                    &["fetch", "--quiet", "--no-filter", "origin", &refspec],
                )?;
                if self.closure(path, commit)? == Closure::Complete {
                    return Ok(());
                }
            }
            Closure::Partial => {}
        }

        // Negotiation assumed we hold objects that an earlier tree-less fetch
        // skipped; ask for the whole closure without negotiating.
        debug!("Refetching full closure of {} into {}", commit, path.display());
        self.git.run_checked(
            path,
            &[
                "fetch",
                "--quiet",
                "--no-filter",
                "--refetch",
                "origin",
                &refspec,
            ],
        )?;
        Ok(())
    }

    /// Fetches just the commit objects for `commits`, without trees.
    pub fn fetch_commits_treeless(&self, path: &Path, commits: &[&str]) -> Result<()> {
        let _guard = self.lock(path)?;
        let refspecs: Vec<String> = commits
            .iter()
            .map(|c| format!("+{}:{}", c, pin_ref(c)))
            .collect();
        let mut args = vec!["fetch", "--quiet", "--filter=tree:0", "origin"];
        args.extend(refspecs.iter().map(String::as_str));
        self.git.run_checked(path, &args)?;
        Ok(())
    }

    /// Ensures the mirror for `url` exists and holds the full closure of
    /// `commit`; returns its path.
    pub fn prepare(&self, url: &str, commit: &str) -> Result<PathBuf> {
        let path = self.path_for(url);
        self.ensure_initialized(url, &path)?;
        self.ensure_has_commit(&path, commit)?;
        Ok(path)
    }

    /// Materializes a non-bare repository at `target_dir`, checked out
    /// detached at `commit`, with objects taken from `cache_path`.
    pub fn checkout_full_repo_at(
        &self,
        cache_path: &Path,
        repo_url: &str,
        commit: &str,
        target_dir: &Path,
    ) -> Result<()> {
        if !target_dir.join(".git").exists() {
            fs::create_dir_all(target_dir)?;
            let cache = cache_path.to_string_lossy();
            self.git.run_checked(target_dir, &["init", "--quiet"])?;
            self.git
                .run_checked(target_dir, &["remote", "add", "origin", repo_url])?;
            self.git
                .run_checked(target_dir, &["remote", "add", CACHE_REMOTE, &cache])?;
        }
        self.git
            .run_checked(target_dir, &["fetch", "--quiet", CACHE_REMOTE, commit])?;
        self.git
            .run_checked(target_dir, &["checkout", "--quiet", "--detach", commit])?;
        Ok(())
    }

    /// True iff the working tree or index of `repo_path` differs from HEAD.
    ///
    /// `repo_path` must hold its own `.git`; git would otherwise discover an
    /// enclosing repository and report on that one.
    pub fn is_dirty(&self, repo_path: &Path) -> Result<bool> {
        if !repo_path.join(".git").exists() {
            return Err(Error::NotARepository {
                path: repo_path.to_path_buf(),
                message: "no .git in the package directory".to_string(),
            });
        }
        // Refresh stat info so touched-but-unchanged files are not reported.
        self.git
            .run(repo_path, &["update-index", "-q", "--refresh"])?;
        let output = self
            .git
            .run(repo_path, &["diff-index", "--quiet", "HEAD", "--"])?;
        match output.code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::NotARepository {
                path: repo_path.to_path_buf(),
                message: output.stderr.trim().to_string(),
            }),
        }
    }
}
