//! # Status Command Implementation
//!
//! Reports, for each package in the root manifest, its state on disk and what
//! `sync` would do about it. Nothing is fetched or written.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{open_session, ProjectArgs};
use gitpin::output::{self, OutputConfig};
use gitpin::realize::Outcome;
use gitpin::state::Action;

/// Show package states without changing anything
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusEntry<'a> {
    name: &'a str,
    dir: String,
    state: String,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<&'a str>,
}

impl<'a> From<&'a Outcome> for StatusEntry<'a> {
    fn from(outcome: &'a Outcome) -> Self {
        Self {
            name: &outcome.name,
            dir: outcome.dir.display().to_string(),
            state: outcome.state.to_string(),
            action: action_label(&outcome.action),
            diagnostic: outcome.diagnostic.as_deref(),
        }
    }
}

fn action_label(action: &Action) -> &'static str {
    match action {
        Action::Realize => "realize",
        Action::Skip => "none",
        Action::Refuse(_) => "refuse",
    }
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, config: &OutputConfig) -> Result<()> {
    let (manifest, session) = open_session(&args.project)?;
    let previews = manifest
        .package_decls()?
        .iter()
        .map(|decl| session.preview(decl))
        .collect::<gitpin::error::Result<Vec<_>>>()?;

    if args.json {
        let entries: Vec<StatusEntry> = previews.iter().map(StatusEntry::from).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if previews.is_empty() {
        println!("No packages declared in {}", args.project.manifest.display());
        return Ok(());
    }
    for outcome in &previews {
        println!("{}", output::outcome_line(config, outcome));
    }
    let pending = previews.iter().filter(|o| o.realized()).count();
    if pending > 0 {
        println!("{} package(s) would be realized by `gitpin sync`", pending);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitpin::state::{PackageState, Refusal};
    use std::path::PathBuf;

    #[test]
    fn test_status_entry_json_shape() {
        let outcome = Outcome {
            name: "fmt".to_string(),
            dir: PathBuf::from("extern/fmt"),
            state: PackageState::Foreign,
            action: Action::Refuse(Refusal::ForeignDirectory),
            diagnostic: Some("left alone".to_string()),
            wired: true,
        };
        let json = serde_json::to_value(StatusEntry::from(&outcome)).unwrap();
        assert_eq!(json["name"], "fmt");
        assert_eq!(json["state"], "foreign");
        assert_eq!(json["action"], "refuse");
        assert_eq!(json["diagnostic"], "left alone");
    }

    #[test]
    fn test_diagnostic_omitted_when_absent() {
        let outcome = Outcome {
            name: "fmt".to_string(),
            dir: PathBuf::from("extern/fmt"),
            state: PackageState::Current,
            action: Action::Skip,
            diagnostic: None,
            wired: true,
        };
        let json = serde_json::to_value(StatusEntry::from(&outcome)).unwrap();
        assert_eq!(json["action"], "none");
        assert!(json.get("diagnostic").is_none());
    }
}
