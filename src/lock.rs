//! Advisory file locks for state shared between concurrent `gitpin` runs.
//!
//! The mirror cache and the ancestry store live in a per-user directory that
//! unrelated projects share. Every mutation of one of those entries happens
//! while holding an exclusive lock on a sibling `.lock` file. Locks block
//! until granted and are released when the guard is dropped.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;
use log::debug;

use crate::error::Result;

/// Held exclusive lock; dropping it closes the file and releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    _file: File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Blocks until an exclusive lock on `path` is held.
pub fn acquire(path: &Path) -> Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    debug!("waiting for lock {}", path.display());
    file.lock_exclusive()?;
    Ok(LockGuard {
        _file: file,
        path: path.to_path_buf(),
    })
}

/// The lock file guarding `entry`, e.g. `repos/<hash>` → `repos/<hash>.lock`.
pub fn lock_path_for(entry: &Path) -> PathBuf {
    let mut name = entry
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    entry.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_for_appends_suffix() {
        let entry = PathBuf::from("/cache/repos/abc123");
        assert_eq!(
            lock_path_for(&entry),
            PathBuf::from("/cache/repos/abc123.lock")
        );
    }

    #[test]
    fn test_acquire_creates_parent_and_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/entry.lock");
        let guard = acquire(&path).unwrap();
        assert!(path.exists());
        assert_eq!(guard.path(), path.as_path());
    }

    #[test]
    fn test_lock_is_reacquirable_after_drop() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("entry.lock");
        drop(acquire(&path).unwrap());
        let _again = acquire(&path).unwrap();
    }
}
