//! # Package Realizer
//!
//! Brings one package's checkout directory to its declared state, or explains
//! why it left it alone.
//!
//! ## Modes
//!
//! - **WORKTREE / VENDORED**: a snapshot. The commit is fetched at depth 1 from
//!   the declared URL into a scratch repository next to the target, checked
//!   out, stripped of `.git`, and swapped in for the old directory. WORKTREE
//!   additionally appends `*` to its top-level `.gitignore` so the root project
//!   never tracks it; VENDORED content is meant to be committed.
//! - **FULL**: a nested repository fed from the shared object cache. An
//!   existing checkout with uncommitted changes is never overwritten.
//!
//! After a successful realization the metadata record is rewritten. A
//! `Current` package costs exactly one metadata read.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::mirror::{ObjectCache, CACHE_REMOTE};
use crate::package::PackageDecl;
use crate::state::{
    decide, Action, CheckoutMode, Decision, PackageRecord, PackageState, Refusal, UpdatePolicy,
};

/// What happened to one package during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub name: String,
    pub dir: PathBuf,
    pub state: PackageState,
    pub action: Action,
    /// Diagnostic for a refusal, already logged as a warning.
    pub diagnostic: Option<String>,
    /// Whether the package takes part in the root build.
    pub wired: bool,
}

impl Outcome {
    pub fn realized(&self) -> bool {
        self.action == Action::Realize
    }
}

pub struct Realizer {
    cache: ObjectCache,
    build_descriptors: Vec<String>,
    auto_update: bool,
}

impl Realizer {
    pub fn new(cache: ObjectCache, build_descriptors: Vec<String>, auto_update: bool) -> Self {
        Self {
            cache,
            build_descriptors,
            auto_update,
        }
    }

    fn git(&self) -> &dyn GitRunner {
        self.cache.runner()
    }

    /// Decides what a realization of `decl` at `dir` would do, without doing it.
    pub fn inspect(
        &self,
        decl: &PackageDecl,
        dir: &Path,
    ) -> Result<(Decision, Option<PackageRecord>)> {
        let dir_exists = dir.exists();
        let recorded = if dir_exists {
            PackageRecord::read(dir)?
        } else {
            None
        };
        let policy = UpdatePolicy {
            global: self.auto_update,
            package: decl.auto_update,
        };
        let decision = decide(&decl.to_record(), recorded.as_ref(), dir_exists, policy);
        Ok((decision, recorded))
    }

    /// The outcome realizing `decl` would have, with no git calls or writes.
    pub fn preview(&self, decl: &PackageDecl, dir: &Path) -> Result<Outcome> {
        let (decision, recorded) = self.inspect(decl, dir)?;
        let diagnostic = match decision.action {
            Action::Refuse(refusal) => {
                Some(self.describe_refusal(refusal, decl, dir, recorded.as_ref()))
            }
            Action::Skip | Action::Realize => None,
        };
        Ok(Outcome {
            name: decl.name.clone(),
            dir: dir.to_path_buf(),
            state: decision.state,
            action: decision.action,
            diagnostic,
            wired: decl.wire_into_build,
        })
    }

    /// Realizes `decl` into `dir` if its state calls for it.
    pub fn realize(&self, decl: &PackageDecl, dir: &Path) -> Result<Outcome> {
        let (decision, recorded) = self.inspect(decl, dir)?;

        let diagnostic = match decision.action {
            Action::Skip => None,
            Action::Refuse(refusal) => {
                let message = self.describe_refusal(refusal, decl, dir, recorded.as_ref());
                warn!("{}", message);
                Some(message)
            }
            Action::Realize => {
                info!(
                    "Realizing {} at {} ({}, {})",
                    decl.name, dir.display(), decl.commit, decl.checkout_mode
                );
                match decl.checkout_mode {
                    CheckoutMode::Worktree | CheckoutMode::Vendored => {
                        self.realize_snapshot(decl, dir)?
                    }
                    CheckoutMode::Full => self.realize_full(decl, dir)?,
                }
                decl.to_record().write(dir)?;
                None
            }
        };

        if decl.wire_into_build && dir.exists() {
            self.check_build_descriptor(&decl.name, dir)?;
        }

        Ok(Outcome {
            name: decl.name.clone(),
            dir: dir.to_path_buf(),
            state: decision.state,
            action: decision.action,
            diagnostic,
            wired: decl.wire_into_build,
        })
    }

    fn realize_snapshot(&self, decl: &PackageDecl, dir: &Path) -> Result<()> {
        let parent = dir.parent().ok_or_else(|| Error::ConfigParse {
            message: format!("package directory {} has no parent", dir.display()),
            hint: None,
        })?;
        fs::create_dir_all(parent)?;

        let scratch = tempfile::Builder::new()
            .prefix(".gitpin-")
            .tempdir_in(parent)?;
        let work = scratch.path();

        self.git().run_checked(work, &["init", "--quiet"])?;
        self.git().run_checked(
            work,
            &[
                "fetch",
                "--quiet",
                "--depth",
                "1",
                &decl.repository_url,
                &decl.commit,
            ],
        )?;
        self.git()
            .run_checked(work, &["checkout", "--quiet", "--detach", &decl.commit])?;

        let bookkeeping = work.join(".git");
        if bookkeeping.exists() {
            fs::remove_dir_all(&bookkeeping)?;
        }
        if decl.checkout_mode == CheckoutMode::Worktree {
            add_ignore_marker(work)?;
        }

        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        fs::rename(work, dir)?;
        Ok(())
    }

    fn realize_full(&self, decl: &PackageDecl, dir: &Path) -> Result<()> {
        let existing = dir.exists();
        if existing && self.cache.is_dirty(dir)? {
            return Err(Error::DirtyCheckout {
                name: decl.name.clone(),
                path: dir.to_path_buf(),
            });
        }

        let mirror = self.cache.prepare(&decl.repository_url, &decl.commit)?;

        if existing {
            self.ensure_remote(dir, "origin", &decl.repository_url)?;
            self.ensure_remote(dir, CACHE_REMOTE, &mirror.to_string_lossy())?;
            self.git()
                .run_checked(dir, &["fetch", "--quiet", "--tags", "origin"])?;
        }

        self.cache
            .checkout_full_repo_at(&mirror, &decl.repository_url, &decl.commit, dir)
    }

    /// Points remote `name` of the repository at `dir` to `url`.
    fn ensure_remote(&self, dir: &Path, name: &str, url: &str) -> Result<()> {
        // `git remote get-url` exits 2 for an unknown remote.
        let current = self
            .git()
            .run_expecting(dir, &["remote", "get-url", name], &[0, 2])?;
        if !current.success() {
            self.git().run_checked(dir, &["remote", "add", name, url])?;
        } else if current.stdout.trim() != url {
            self.git()
                .run_checked(dir, &["remote", "set-url", name, url])?;
        }
        Ok(())
    }

    fn check_build_descriptor(&self, name: &str, dir: &Path) -> Result<()> {
        if self
            .build_descriptors
            .iter()
            .any(|descriptor| dir.join(descriptor).is_file())
        {
            return Ok(());
        }
        Err(Error::MissingBuildDescriptor {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            expected: self.build_descriptors.clone(),
        })
    }

    fn describe_refusal(
        &self,
        refusal: Refusal,
        decl: &PackageDecl,
        dir: &Path,
        recorded: Option<&PackageRecord>,
    ) -> String {
        match (refusal, recorded) {
            (Refusal::ModeChanged { from, to }, _) => format!(
                "{}: {} is a {} checkout but {} is declared; not converting automatically. \
                 Remove the directory to re-realize it.",
                decl.name,
                dir.display(),
                from,
                to
            ),
            (Refusal::AutoUpdateDisabled, Some(recorded)) => format!(
                "{}: {} holds {}@{} but {}@{} is declared; auto-update is disabled \
                 (global: {}, package: {}), leaving it untouched.",
                decl.name,
                dir.display(),
                recorded.repository_url,
                recorded.commit,
                decl.repository_url,
                decl.commit,
                on_off(self.auto_update),
                on_off(decl.auto_update)
            ),
            _ => format!(
                "{}: {} exists but has no {} record; leaving it untouched. \
                 Remove it to let gitpin manage this package.",
                decl.name,
                dir.display(),
                crate::state::RECORD_FILE
            ),
        }
    }
}

/// Appends `*` to the snapshot's top-level `.gitignore`, keeping any lines the
/// package ships itself.
fn add_ignore_marker(dir: &Path) -> Result<()> {
    let path = dir.join(".gitignore");
    let mut contents = match fs::read_to_string(&path) {
        Ok(existing) => existing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str("*\n");
    fs::write(&path, contents)?;
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
