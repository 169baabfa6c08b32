//! Adapters for the external block plugin checker.
//!
//! The checker inspects a repository and reports its findings; this crate only
//! interprets them. [`ProcessChecker`] runs a configured command that prints
//! the results as JSON on stdout, and [`JsonFileChecker`] reads results that
//! were produced earlier.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::check::CheckOutput;
use crate::errors::CheckerError;

pub trait Checker {
    /// Check the repository at `repo` (a Subversion/GitHub URL or a plugin slug).
    fn run_check(&self, repo: &str) -> Result<CheckOutput, CheckerError>;
}

/// Runs `command args... <repo>` and parses its stdout.
///
/// Exit code 0 means the checker ran; the findings themselves are in the JSON,
/// never in the exit code. Any timeout policy belongs to the command.
pub struct ProcessChecker {
    command: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessChecker {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

impl Checker for ProcessChecker {
    fn run_check(&self, repo: &str) -> Result<CheckOutput, CheckerError> {
        tracing::info!(command = %self.command, repo, "Running checker");

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(repo);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| CheckerError::SpawnFailed {
            command: self.command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CheckerError::NonZeroExit {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: CheckOutput =
            serde_json::from_slice(&output.stdout).map_err(CheckerError::InvalidOutput)?;
        tracing::debug!(
            slug = parsed.slug.as_deref().unwrap_or("-"),
            results = parsed.results.len(),
            "Checker finished"
        );
        Ok(parsed)
    }
}

/// Serves results from a JSON file in the checker's output format.
pub struct JsonFileChecker {
    path: PathBuf,
}

impl JsonFileChecker {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Checker for JsonFileChecker {
    fn run_check(&self, repo: &str) -> Result<CheckOutput, CheckerError> {
        tracing::info!(path = %self.path.display(), repo, "Reading checker results");
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| CheckerError::ResultsReadFailed {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(CheckerError::InvalidOutput)
    }
}
