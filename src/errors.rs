//! Typed error hierarchy for the block validator.
//!
//! - `CheckerError`: the external checker could not produce results
//! - `GateError`: a registry membership transition was refused or failed
//! - `ConfigError`: a configuration value cannot be used
//!
//! Validation findings are not errors; they flow through the report as data.

use thiserror::Error;

/// Errors from running the external checker.
///
/// These never fail a validation request: the report is rendered without
/// results and carries an explanatory note instead.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Failed to spawn checker command '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Checker exited with code {exit_code}: {stderr}")]
    NonZeroExit { exit_code: i32, stderr: String },

    #[error("Failed to read checker results at {path}: {source}")]
    ResultsReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checker produced invalid output: {0}")]
    InvalidOutput(#[source] serde_json::Error),
}

/// Errors from a registry membership transition.
#[derive(Debug, Error)]
pub enum GateError {
    /// The actor holds neither the edit-entry nor the plugin-admin capability.
    #[error("Not allowed to change Block Directory membership for this plugin")]
    Unauthorized,

    /// Add was requested while the report contains errors.
    #[error("Plugin can't be added to the Block Directory due to errors in validation")]
    BlockedByErrors,

    #[error("No plugin entry found for '{slug}'")]
    UnknownEntry { slug: String },

    /// The membership write (with its audit record) did not persist.
    #[error("Failed to update Block Directory membership: {0}")]
    StoreWriteFailure(#[source] anyhow::Error),
}

impl GateError {
    /// Check if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreWriteFailure(_))
    }
}

/// Errors from interpreting `validator.toml` values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown collapse_check '{value}'. Valid values: {valid}")]
    UnknownCollapseCheck { value: String, valid: String },

    #[error("Empty check identifier")]
    EmptyCheckId,
}
