//! # Package State
//!
//! What was last realized for a package is recorded in a small TOML document,
//! [`RECORD_FILE`], inside the package's checkout directory. Comparing that
//! record with the declaration is how a run decides, without touching git,
//! whether a package needs work.
//!
//! [`decide`] is the whole state machine. It is pure: it looks only at the
//! desired state, the recorded state, whether the directory exists and the
//! auto-update switches.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the metadata record inside a checkout.
pub const RECORD_FILE: &str = ".gitpin-package.toml";

/// How much version-control history a realized package keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// Snapshot without history, ignored by the root project's git.
    #[default]
    Worktree,
    /// Nested repository with history, checked out detached.
    Full,
    /// Snapshot without history, meant to be committed into the root project.
    Vendored,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Worktree => "worktree",
            CheckoutMode::Full => "full",
            CheckoutMode::Vendored => "vendored",
        }
    }

    /// Whether the checkout is a plain file tree without a `.git` directory.
    pub fn is_snapshot(&self) -> bool {
        !matches!(self, CheckoutMode::Full)
    }
}

impl fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "worktree" => Ok(CheckoutMode::Worktree),
            "full" => Ok(CheckoutMode::Full),
            "vendored" => Ok(CheckoutMode::Vendored),
            other => Err(Error::ConfigParse {
                message: format!("unknown checkout mode '{}'", other),
                hint: Some("use one of: worktree, full, vendored".to_string()),
            }),
        }
    }
}

/// The persisted `(name, repository_url, commit, checkout_mode)` of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub repository_url: String,
    pub commit: String,
    pub checkout_mode: CheckoutMode,
}

impl PackageRecord {
    /// Path of the record belonging to the checkout at `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(RECORD_FILE)
    }

    /// Reads the record of the checkout at `dir`, `None` if there is none.
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Metadata {
                path,
                message: e.to_string(),
            })
    }

    /// Overwrites the record of the checkout at `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let content = toml::to_string(self).map_err(|e| Error::Metadata {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Same repository, commit and mode; the name is not compared.
    pub fn matches(&self, other: &PackageRecord) -> bool {
        self.repository_url == other.repository_url
            && self.commit.eq_ignore_ascii_case(&other.commit)
            && self.checkout_mode == other.checkout_mode
    }
}

/// Where a package stands relative to its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// No checkout directory.
    Absent,
    /// Directory exists but carries no record; never touched automatically.
    Foreign,
    /// Record exists but differs from the declaration.
    Stale,
    /// Record matches the declaration.
    Current,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageState::Absent => "absent",
            PackageState::Foreign => "foreign",
            PackageState::Stale => "stale",
            PackageState::Current => "current",
        })
    }
}

/// Why a package was left as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    ForeignDirectory,
    ModeChanged { from: CheckoutMode, to: CheckoutMode },
    AutoUpdateDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Realize,
    Skip,
    Refuse(Refusal),
}

/// Both switches must be on for a stale package to be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub global: bool,
    pub package: bool,
}

impl UpdatePolicy {
    pub fn allows_update(&self) -> bool {
        self.global && self.package
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: PackageState,
    pub action: Action,
}

/// Maps (desired, recorded, directory presence, switches) to what to do.
pub fn decide(
    desired: &PackageRecord,
    recorded: Option<&PackageRecord>,
    dir_exists: bool,
    policy: UpdatePolicy,
) -> Decision {
    let (state, action) = match (dir_exists, recorded) {
        (false, _) => (PackageState::Absent, Action::Realize),
        (true, None) => (
            PackageState::Foreign,
            Action::Refuse(Refusal::ForeignDirectory),
        ),
        (true, Some(recorded)) if recorded.matches(desired) => {
            (PackageState::Current, Action::Skip)
        }
        (true, Some(recorded)) if recorded.checkout_mode != desired.checkout_mode => (
            PackageState::Stale,
            Action::Refuse(Refusal::ModeChanged {
                from: recorded.checkout_mode,
                to: desired.checkout_mode,
            }),
        ),
        (true, Some(_)) if policy.allows_update() => (PackageState::Stale, Action::Realize),
        (true, Some(_)) => (
            PackageState::Stale,
            Action::Refuse(Refusal::AutoUpdateDisabled),
        ),
    };
    Decision { state, action }
}
