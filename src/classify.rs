//! Partition checker results into severity buckets.
//!
//! One check (by default [`CheckId::BlockJsonSchema`]) tends to emit many
//! near-duplicate findings, so its non-error results are pulled out of the
//! buckets into a separate collapsed list. Errors are never collapsed.

use crate::check::{CheckId, CheckResult, Severity};
use serde::Serialize;

/// Results grouped by severity, each bucket in checker emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Buckets {
    pub errors: Vec<CheckResult>,
    pub warnings: Vec<CheckResult>,
    pub info: Vec<CheckResult>,
}

impl Buckets {
    pub fn get(&self, severity: Severity) -> &[CheckResult] {
        match severity {
            Severity::Error => &self.errors,
            Severity::Warning => &self.warnings,
            Severity::Info => &self.info,
        }
    }

    fn push(&mut self, result: CheckResult) {
        match result.severity() {
            Severity::Error => self.errors.push(result),
            Severity::Warning => self.warnings.push(result),
            Severity::Info => self.info.push(result),
        }
    }

    pub fn total(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }
}

/// Output of [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub buckets: Buckets,
    /// Non-error results of the collapse-target check, in emission order.
    pub collapsed: Vec<CheckResult>,
}

impl Classification {
    /// Accept iff there are no errors. Warnings and notes never block.
    pub fn accepts(&self) -> bool {
        self.buckets.errors.is_empty()
    }

    /// Check if nothing at all was reported.
    pub fn is_empty(&self) -> bool {
        self.buckets.total() == 0 && self.collapsed.is_empty()
    }
}

/// Partition `results` in a single pass.
///
/// A result whose check id equals `collapse` and whose severity is not
/// [`Severity::Error`] goes only to the collapsed list; everything else goes to
/// the bucket for its severity.
///
/// # Examples
///
/// ```
/// use block_validator::check::{CheckId, CheckResult, Severity};
/// use block_validator::classify::classify;
///
/// let results = vec![
///     CheckResult::new(Severity::Warning, CheckId::BlockJsonSchema, "dup A"),
///     CheckResult::new(Severity::Error, CheckId::BlockJsonSchema, "broken"),
/// ];
/// let classified = classify(results, &CheckId::BlockJsonSchema);
/// assert_eq!(classified.collapsed.len(), 1);
/// assert_eq!(classified.buckets.errors.len(), 1);
/// assert!(!classified.accepts());
/// ```
pub fn classify(
    results: impl IntoIterator<Item = CheckResult>,
    collapse: &CheckId,
) -> Classification {
    let mut classification = Classification::default();
    for result in results {
        if !result.is_blocking() && result.check_id() == collapse {
            classification.collapsed.push(result);
        } else {
            classification.buckets.push(result);
        }
    }

    tracing::debug!(
        errors = classification.buckets.errors.len(),
        warnings = classification.buckets.warnings.len(),
        info = classification.buckets.info.len(),
        collapsed = classification.collapsed.len(),
        "Classified check results"
    );
    classification
}
