//! Check result types produced by the block plugin checker.
//!
//! ## Types
//!
//! - [`Severity`]: Error (blocks acceptance), Warning and Info (shown, never blocking)
//! - [`CheckId`]: The closed set of check identifiers, plus an open informational tail
//! - [`CheckResult`]: A single finding emitted by the checker
//! - [`CheckOutput`]: Everything one checker run returns (resolved metadata + results)
//!
//! ## Example
//!
//! ```
//! use block_validator::check::{CheckId, CheckResult, Severity};
//!
//! let result = CheckResult::new(Severity::Error, CheckId::MissingReadme, "No readme.txt");
//! assert!(result.is_blocking());
//! assert_eq!(result.check_id().as_str(), "missing-readme");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Severity of a single check result.
///
/// Ordered from most to least critical, which is also the fixed section order
/// of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks inclusion in the Block Directory.
    Error,
    /// Shown to the author but does not block inclusion.
    Warning,
    /// Self-contained note; never elaborated.
    Info,
}

impl Severity {
    /// All severities in section order.
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    /// Check if this severity blocks acceptance.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_validator::check::Severity;
    ///
    /// assert!(Severity::Error.is_blocking());
    /// assert!(!Severity::Warning.is_blocking());
    /// assert!(!Severity::Info.is_blocking());
    /// ```
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the check that produced a result.
///
/// The known checks form a closed set. Anything else the checker emits is kept
/// verbatim in [`CheckId::Other`]; those are informational and never elaborated.
///
/// Both the canonical kebab-case ids and the checker's legacy `check_*` method
/// names parse to the same variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CheckId {
    MissingReadme,
    MissingLicense,
    MissingPluginHeaders,
    /// Schema validity of block.json. Emits many near-duplicate findings.
    BlockJsonSchema,
    BlockTagMissing,
    DuplicateBlockName,
    NoBlocksRegistered,
    MissingBlockJson,
    MissingScriptFile,
    NoRegisterCall,
    /// block.json could not be parsed at all.
    InvalidBlockJson,
    PhpSizeExceeded,
    NonStandardBlockName,
    Other(String),
}

/// (variant, canonical id, legacy checker method name)
const KNOWN_CHECKS: &[(CheckId, &str, &str)] = &[
    (CheckId::MissingReadme, "missing-readme", "check_readme_exists"),
    (CheckId::MissingLicense, "missing-license", "check_license"),
    (CheckId::MissingPluginHeaders, "missing-plugin-headers", "check_plugin_headers"),
    (CheckId::BlockJsonSchema, "block-json-schema", "check_block_json_is_valid"),
    (CheckId::BlockTagMissing, "block-tag-missing", "check_block_tag"),
    (CheckId::DuplicateBlockName, "duplicate-block-name", "check_for_duplicate_block_name"),
    (CheckId::NoBlocksRegistered, "no-blocks-registered", "check_for_blocks"),
    (CheckId::MissingBlockJson, "missing-block-json", "check_for_block_json"),
    (CheckId::MissingScriptFile, "missing-script-file", "check_for_block_script_files"),
    (CheckId::NoRegisterCall, "no-register-call", "check_for_register_block_type"),
    (CheckId::InvalidBlockJson, "invalid-block-json", "check_block_json_is_valid_json"),
    (CheckId::PhpSizeExceeded, "php-size-exceeded", "check_php_size"),
    (CheckId::NonStandardBlockName, "non-standard-block-name", "check_for_standard_block_name"),
];

impl CheckId {
    /// Canonical identifier string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Other(name) => name,
            known => KNOWN_CHECKS
                .iter()
                .find(|(id, _, _)| id == known)
                .map(|(_, canonical, _)| *canonical)
                .unwrap_or_default(),
        }
    }

    /// Check if this id belongs to the closed set of known checks.
    ///
    /// # Examples
    ///
    /// ```
    /// use block_validator::check::CheckId;
    ///
    /// assert!(CheckId::PhpSizeExceeded.is_known());
    /// assert!(!"plugin-uses-jquery".parse::<CheckId>().unwrap().is_known());
    /// ```
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// The canonical ids of all known checks, in declaration order.
    pub fn known_ids() -> impl Iterator<Item = &'static str> {
        KNOWN_CHECKS.iter().map(|(_, canonical, _)| *canonical)
    }
}

impl FromStr for CheckId {
    type Err = ConfigError;

    /// Parse a check id. Unknown names become [`CheckId::Other`]; only an empty
    /// name is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::EmptyCheckId);
        }
        Ok(KNOWN_CHECKS
            .iter()
            .find(|(_, canonical, legacy)| *canonical == s || *legacy == s)
            .map(|(id, _, _)| id.clone())
            .unwrap_or_else(|| Self::Other(s.to_string())))
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CheckId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CheckId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single finding from the checker. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(alias = "type")]
    severity: Severity,
    #[serde(alias = "check_name")]
    check_id: CheckId,
    /// Pre-rendered, human-readable message. Opaque to the report engine.
    message: String,
}

impl CheckResult {
    pub fn new(severity: Severity, check_id: CheckId, message: impl Into<String>) -> Self {
        Self {
            severity,
            check_id,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn check_id(&self) -> &CheckId {
        &self.check_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.check_id, self.message)
    }
}

/// Output of one checker run.
///
/// The metadata fields are only present when the checker could resolve the
/// repository; a failed resolution yields no metadata and usually no results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default)]
    pub results: Vec<CheckResult>,
}

impl CheckOutput {
    /// Check if the checker resolved both the repository and its revision.
    pub fn is_resolved(&self) -> bool {
        self.repo_url.is_some() && self.revision.is_some()
    }
}
