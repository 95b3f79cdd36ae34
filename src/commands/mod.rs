//! # CLI Command Implementations
//!
//! Each subcommand of `gitpin` lives in its own file with:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and drives the
//!   `gitpin` library.

pub mod cache;
pub mod completions;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use gitpin::ancestry::JsonFactStore;
use gitpin::defaults;
use gitpin::git::SystemGit;
use gitpin::manifest::{self, Manifest};
use gitpin::session::{Session, Settings};

/// Arguments shared by commands that operate on a project.
#[derive(clap::Args, Debug)]
pub struct ProjectArgs {
    /// Path to the root manifest
    #[arg(long, short, value_name = "FILE", default_value = defaults::MANIFEST_FILE)]
    pub manifest: PathBuf,

    /// Base directory of the shared object cache
    #[arg(long, value_name = "DIR", env = defaults::CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Update packages whose recorded commit differs from the declared one
    #[arg(
        long,
        env = defaults::AUTO_UPDATE_ENV,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub auto_update: bool,
}

/// Loads the manifest and opens a session rooted at the manifest's directory.
pub(crate) fn open_session(args: &ProjectArgs) -> Result<(Manifest, Session)> {
    let manifest = manifest::from_file(&args.manifest)?;
    let project_root = project_root(&args.manifest);
    let cache_root = defaults::resolve_cache_root(args.cache_dir.as_deref());
    log::debug!("Using object cache at {}", cache_root.display());

    let store = JsonFactStore::in_cache_root(&cache_root)
        .with_context(|| format!("Failed to open ancestry store in {}", cache_root.display()))?;
    let settings = Settings::new(&project_root, &cache_root)
        .with_manifest(&manifest)
        .auto_update(args.auto_update);
    let session = Session::new(settings, Arc::new(SystemGit::new()), Box::new(store));
    Ok((manifest, session))
}

fn project_root(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
