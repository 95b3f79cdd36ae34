//! # Sync Command Implementation
//!
//! This module implements the `sync` subcommand, which brings every package
//! declared in the root manifest to its pinned state and then validates all
//! minimum-commit requirements.
//!
//! ## Functionality
//!
//! 1.  **Load**: reads `gitpin.yaml` and rejects malformed entries before any
//!     package is touched.
//! 2.  **Realize**: packages are processed in manifest order. Current packages
//!     are left alone; foreign directories, mode switches and stale packages
//!     without auto-update are reported and skipped.
//! 3.  **Validate**: requirements from the root and from realized packages are
//!     checked against the pinned commits. The first violation fails the run.
//!
//! A summary line is printed for every package processed, including those
//! processed before a fatal error.

use anyhow::Result;
use clap::Args;

use super::{open_session, ProjectArgs};
use gitpin::output::{self, OutputConfig};

/// Realize pinned packages and check requirements
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Suppress the per-package summary
    #[arg(long, short)]
    pub quiet: bool,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, config: &OutputConfig) -> Result<()> {
    let (manifest, mut session) = open_session(&args.project)?;
    let result = session.sync(&manifest);

    if !args.quiet {
        for outcome in session.outcomes() {
            println!("{}", output::outcome_line(config, outcome));
        }
    }
    let checked = result?;

    if !args.quiet {
        let realized = session.outcomes().iter().filter(|o| o.realized()).count();
        let skipped = session
            .outcomes()
            .iter()
            .filter(|o| o.diagnostic.is_some())
            .count();
        println!(
            "{} {} package(s), {} realized, {} left untouched, {} requirement(s) satisfied",
            output::emoji(config, "🎉", "Done:"),
            session.outcomes().len(),
            realized,
            skipped,
            checked
        );
    }
    Ok(())
}
