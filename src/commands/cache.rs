//! # Cache Command Implementation
//!
//! This module implements the `cache` subcommand, which inspects the shared
//! object cache.
//!
//! ## Subcommands
//!
//! - **`root`**: Print the cache base directory
//! - **`path <url>`**: Print the mirror directory for a repository URL
//! - **`list`**: Display every mirror with its origin, pin count and size

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use gitpin::defaults;
use gitpin::git::SystemGit;
use gitpin::mirror::{mirror_path, MirrorEntry, ObjectCache};

/// Inspect the shared object cache
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Base directory of the shared object cache.
    ///
    /// Defaults to the system's cache directory (e.g. `~/.cache/gitpin` on
    /// Linux).
    #[arg(long, value_name = "DIR", env = defaults::CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Print the cache base directory
    Root,
    /// Print the mirror directory used for a repository URL
    Path {
        /// Repository URL exactly as written in the manifest
        url: String,
    },
    /// List cached mirrors
    List(ListArgs),
}

/// Arguments for the cache list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    path: PathBuf,
    url: Option<String>,
    pinned: usize,
    size: u64,
}

/// Execute the `cache` command.
pub fn execute(args: CacheArgs) -> Result<()> {
    let cache_root = defaults::resolve_cache_root(args.cache_dir.as_deref());
    match args.command {
        CacheSubcommand::Root => {
            println!("{}", cache_root.display());
            Ok(())
        }
        CacheSubcommand::Path { url } => {
            println!("{}", mirror_path(&cache_root, &url).display());
            Ok(())
        }
        CacheSubcommand::List(list_args) => execute_list(&cache_root, list_args),
    }
}

/// Execute the `cache list` command.
fn execute_list(cache_root: &Path, args: ListArgs) -> Result<()> {
    let cache = ObjectCache::new(cache_root.to_path_buf(), Arc::new(SystemGit::new()));
    let entries: Vec<ListEntry> = cache.entries()?.into_iter().map(list_entry).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No mirrors found in: {}", cache_root.display());
        return Ok(());
    }

    println!("{:<16} {:>6} {:>12}  URL", "MIRROR", "PINS", "SIZE");
    println!("{}", "-".repeat(80));
    for entry in &entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<16} {:>6} {:>12}  {}",
            &name[..name.len().min(16)],
            entry.pinned,
            format_size(entry.size),
            entry.url.as_deref().unwrap_or("(unknown)")
        );
    }
    let total: u64 = entries.iter().map(|e| e.size).sum();
    println!(
        "\nTotal: {} mirror(s), {}",
        entries.len(),
        format_size(total)
    );
    Ok(())
}

fn list_entry(mirror: MirrorEntry) -> ListEntry {
    ListEntry {
        size: directory_size(&mirror.path),
        path: mirror.path,
        url: mirror.url,
        pinned: mirror.pinned,
    }
}

fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.metadata().ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .sum()
}

/// Format size in human-readable format
fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
