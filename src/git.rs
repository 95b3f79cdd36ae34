//! Subprocess plumbing for the system `git` binary.
//!
//! Every interaction with a repository goes through [`GitRunner`]. The real
//! implementation, [`SystemGit`], spawns `git` and captures its exit code and
//! output streams; nothing else about git is assumed. This uses the system git
//! command, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Any authentication configured in ~/.gitconfig
//!
//! Callers decide which exit codes they expect. Anything else becomes a
//! uniform [`Error::GitCommand`] carrying the command line, working directory
//! and captured output, built in exactly one place ([`GitOutput::into_error`]).

use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Captured result of one `git` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// A successful, silent invocation.
    pub fn ok() -> Self {
        Self::with_code(0)
    }

    /// An invocation that exited with `code` and printed nothing.
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    /// A successful invocation that printed `stdout`.
    pub fn stdout(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Build the uniform diagnostic for an unexpected exit.
    pub fn into_error(self, cwd: &Path, args: &[&str]) -> Error {
        Error::GitCommand {
            command: command_line(args),
            cwd: cwd.to_path_buf(),
            code: self.code,
            stdout: self.stdout.trim_end().to_string(),
            stderr: self.stderr.trim_end().to_string(),
        }
    }
}

/// Renders `args` the way a user would type them.
pub fn command_line(args: &[&str]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Trait for running git - allows scripting git in tests
pub trait GitRunner: Send + Sync {
    /// Runs `git <args>` in `cwd` and returns whatever it produced.
    ///
    /// Only a failure to spawn the process is an error here; interpreting the
    /// exit code is the caller's job.
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput>;

    /// Runs git and fails unless it exits 0.
    fn run_checked(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        self.run_expecting(cwd, args, &[0])
    }

    /// Runs git and fails unless the exit code is one of `expected`.
    fn run_expecting(&self, cwd: &Path, args: &[&str], expected: &[i32]) -> Result<GitOutput> {
        let output = self.run(cwd, args)?;
        match output.code {
            Some(code) if expected.contains(&code) => Ok(output),
            _ => Err(output.into_error(cwd, args)),
        }
    }
}

/// The default implementation of `GitRunner`, which spawns the system's
/// `git` command.
#[derive(Debug, Clone)]
pub struct SystemGit {
    program: PathBuf,
}

impl SystemGit {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner for SystemGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        debug!("{} (in {})", command_line(args), cwd.display());

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            // Never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|source| Error::GitSpawn {
                command: command_line(args),
                cwd: cwd.to_path_buf(),
                source,
            })?;

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
