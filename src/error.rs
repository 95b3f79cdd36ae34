//! # Error Handling
//!
//! This module defines the centralized error type for `gitpin`. It uses the
//! `thiserror` library to build one `Error` enum covering every fatal
//! condition the engine can hit, each variant carrying the context a user
//! needs to act on it.
//!
//! ## Error Kinds
//!
//! - **Configuration errors** (`ConfigParse`, `InvalidName`,
//!   `DuplicatePackage`, `MissingBuildDescriptor`): raised before any git I/O
//!   where possible.
//! - **External-tool errors** (`GitCommand`, `GitSpawn`, `NotARepository`,
//!   `AncestryUndetermined`): a `git` invocation produced an exit code the
//!   caller did not expect. `GitCommand` carries the full command line, the
//!   working directory and both captured streams.
//! - **Safety errors** (`DirtyCheckout`): realizing would overwrite
//!   uncommitted work in a history-carrying checkout.
//! - **Constraint errors** (`UnknownPackage`, `ConstraintViolation`): raised by
//!   the finalizer.
//!
//! Safety-guard refusals such as foreign directories or disabled auto-update
//! are not errors; see [`crate::state::Refusal`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gitpin operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest or a declaration is malformed.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A package name does not match `[A-Za-z0-9_.-]+`.
    #[error("Invalid package name '{name}': only letters, digits, '_', '.' and '-' are allowed")]
    InvalidName { name: String },

    /// Two declarations normalize to the same identifier.
    #[error("Package '{name}' collides with already declared package '{existing}' (both normalize to '{normalized}')")]
    DuplicatePackage {
        name: String,
        existing: String,
        normalized: String,
    },

    /// Wiring into the build was requested but no build descriptor exists.
    #[error("Package '{name}' is wired into the build but {} contains none of: {}", dir.display(), expected.join(", "))]
    MissingBuildDescriptor {
        name: String,
        dir: PathBuf,
        expected: Vec<String>,
    },

    /// `git` exited with a code the caller did not expect.
    #[error("Git command failed (exit code {}): {command}\n  in: {}\n  stdout: {stdout}\n  stderr: {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()), cwd.display())]
    GitCommand {
        command: String,
        cwd: PathBuf,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// `git` could not be started at all.
    #[error("Failed to run {command} in {}: {source}", cwd.display())]
    GitSpawn {
        command: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory expected to hold a git repository does not.
    #[error("Not a git repository: {} ({message})", path.display())]
    NotARepository { path: PathBuf, message: String },

    /// Ancestry could not be decided even after fetching both commits.
    #[error("Cannot decide whether {ancestor} is an ancestor of {descendant} in {url}: commits unavailable after fetch")]
    AncestryUndetermined {
        url: String,
        ancestor: String,
        descendant: String,
    },

    /// A FULL checkout has local modifications that realizing would destroy.
    #[error("Refusing to update package '{name}': {} has uncommitted changes; commit or stash them first", path.display())]
    DirtyCheckout { name: String, path: PathBuf },

    /// A requirement names a package that was never declared.
    #[error("{origin} requires package '{package}', which was never declared")]
    UnknownPackage { origin: String, package: String },

    /// A pinned commit does not descend from a required minimum commit.
    #[error("{origin} requires package '{package}' at or after {required}, but {actual} is pinned; advance the pinned commit")]
    ConstraintViolation {
        origin: String,
        package: String,
        required: String,
        actual: String,
    },

    /// The metadata record beside a checkout could not be read or written.
    #[error("Package metadata error at {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    /// The persisted ancestry store failed.
    #[error("Ancestry store error: {message}")]
    Store { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
