//! Default values for gitpin configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the cache base directory.
pub const CACHE_DIR_ENV: &str = "GITPIN_CACHE_DIR";

/// Environment variable for the global auto-update switch.
pub const AUTO_UPDATE_ENV: &str = "GITPIN_AUTO_UPDATE";

/// Manifest file name, both for the root project and for dependents.
pub const MANIFEST_FILE: &str = "gitpin.yaml";

/// Directory, relative to the project root, that receives packages.
pub const PACKAGES_DIR: &str = "extern";

/// Files whose presence makes a package composable into the root build.
pub const BUILD_DESCRIPTORS: &[&str] = &["CMakeLists.txt"];

/// Returns the default cache base directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/gitpin` (XDG Base Directory)
/// - macOS: `~/Library/Caches/gitpin`
/// - Windows: `{FOLDERID_LocalAppData}\gitpin`
///
/// Falls back to `.gitpin-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-dir` CLI flag or the
/// `GITPIN_CACHE_DIR` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("gitpin"))
        .unwrap_or_else(|| PathBuf::from(".gitpin-cache"))
}

/// Resolves the cache base: explicit override first, then the user cache dir.
///
/// The result is absolute. FULL checkouts register the mirror as a remote and
/// git resolves that path from inside the package directory.
pub fn resolve_cache_root(explicit: Option<&Path>) -> PathBuf {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os(CACHE_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_root),
    };
    absolutize(root)
}

/// Anchors a relative path at the current directory.
pub fn absolutize(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
