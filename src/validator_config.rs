//! Configuration file for the block validator.
//!
//! Settings are read from `.block-validator/validator.toml`, then environment
//! variables, then CLI arguments.
//!
//! # Configuration File Format
//!
//! ```toml
//! [checker]
//! command = "block-plugin-checker"
//! args = ["--format", "json"]
//!
//! [report]
//! collapse_check = "block-json-schema"
//!
//! [registry]
//! db_path = "registry.db"
//! section = "block"
//!
//! [notify]
//! from = "plugins@wordpress.org"
//! outbox_dir = "outbox"
//! validator_url = "https://wordpress.org/plugins/developers/block-plugin-validator/"
//! browse_url = "https://wordpress.org/plugins/browse/block/"
//!
//! [links]
//! trac_url = "https://plugins.trac.wordpress.org"
//! admin_url = "https://wordpress.org/plugins/wp-admin"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::check::CheckId;
use crate::errors::ConfigError;
use crate::init::VALIDATOR_DIR;

/// Name of the configuration file inside `.block-validator/`.
pub const CONFIG_FILE: &str = "validator.toml";

/// External checker invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckerSection {
    /// Checker command (default: "block-plugin-checker")
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments placed before the repository location
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Check whose non-error results are collapsed into one block
    #[serde(default = "default_collapse_check")]
    pub collapse_check: String,
}

fn default_collapse_check() -> String {
    CheckId::BlockJsonSchema.to_string()
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            collapse_check: default_collapse_check(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// SQLite database, relative to `.block-validator/` unless absolute
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Taxonomy section that marks Block Directory membership
    #[serde(default = "default_section")]
    pub section: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("registry.db")
}

fn default_section() -> String {
    crate::registry::BLOCK_SECTION.to_string()
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            section: default_section(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySection {
    #[serde(default = "default_from")]
    pub from: String,
    /// Outbox directory, relative to `.block-validator/` unless absolute
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
    #[serde(default = "default_validator_url")]
    pub validator_url: String,
    #[serde(default = "default_browse_url")]
    pub browse_url: String,
}

fn default_from() -> String {
    "plugins@wordpress.org".to_string()
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("outbox")
}

fn default_validator_url() -> String {
    "https://wordpress.org/plugins/developers/block-plugin-validator/".to_string()
}

fn default_browse_url() -> String {
    "https://wordpress.org/plugins/browse/block/".to_string()
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            from: default_from(),
            outbox_dir: default_outbox_dir(),
            validator_url: default_validator_url(),
            browse_url: default_browse_url(),
        }
    }
}

/// Base URLs for the review tooling links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksSection {
    #[serde(default = "default_trac_url")]
    pub trac_url: String,
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
}

fn default_trac_url() -> String {
    "https://plugins.trac.wordpress.org".to_string()
}

fn default_admin_url() -> String {
    "https://wordpress.org/plugins/wp-admin".to_string()
}

impl Default for LinksSection {
    fn default() -> Self {
        Self {
            trac_url: default_trac_url(),
            admin_url: default_admin_url(),
        }
    }
}

/// Contents of `validator.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorToml {
    #[serde(default)]
    pub checker: CheckerSection,
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub registry: RegistrySection,
    #[serde(default)]
    pub notify: NotifySection,
    #[serde(default)]
    pub links: LinksSection,
}

impl ValidatorToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse validator.toml")
    }

    /// Load from `<validator_dir>/validator.toml`, or defaults if it doesn't exist.
    pub fn load_or_default(validator_dir: &Path) -> Result<Self> {
        let config_path = validator_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize validator.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Checker command (file → env → default).
    pub fn checker_cmd(&self) -> String {
        self.checker
            .command
            .clone()
            .or_else(|| std::env::var("BLOCK_VALIDATOR_CHECKER_CMD").ok())
            .unwrap_or_else(|| "block-plugin-checker".to_string())
    }

    pub fn collapse_check(&self) -> Result<CheckId, ConfigError> {
        let id: CheckId = self.report.collapse_check.parse()?;
        if !id.is_known() {
            return Err(ConfigError::UnknownCollapseCheck {
                value: self.report.collapse_check.clone(),
                valid: CheckId::known_ids().collect::<Vec<_>>().join(", "),
            });
        }
        Ok(id)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.collapse_check() {
            warnings.push(e.to_string());
        }
        if self.registry.section.trim().is_empty() {
            warnings.push("registry.section must not be empty".to_string());
        }
        if !self.notify.from.contains('@') {
            warnings.push(format!(
                "notify.from '{}' does not look like an email address",
                self.notify.from
            ));
        }
        for (name, url) in [
            ("notify.validator_url", &self.notify.validator_url),
            ("notify.browse_url", &self.notify.browse_url),
            ("links.trac_url", &self.links.trac_url),
            ("links.admin_url", &self.links.admin_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(format!("{name} '{url}' is not an http(s) URL"));
            }
        }

        warnings
    }
}

/// Configuration merged from the file, environment and CLI.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub project_dir: PathBuf,
    pub validator_dir: PathBuf,
    pub toml: ValidatorToml,
    /// CLI override for the registry database path
    pub cli_db_path: Option<PathBuf>,
}

impl ValidatorConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let validator_dir = project_dir.join(VALIDATOR_DIR);
        let toml = ValidatorToml::load_or_default(&validator_dir)?;

        Ok(Self {
            project_dir,
            validator_dir,
            toml,
            cli_db_path: None,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, db_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.cli_db_path = db_path;
        Ok(config)
    }

    /// Registry database path (CLI → env → file).
    pub fn db_path(&self) -> PathBuf {
        self.cli_db_path
            .clone()
            .or_else(|| std::env::var_os("BLOCK_VALIDATOR_DB").map(PathBuf::from))
            .unwrap_or_else(|| self.resolve(&self.toml.registry.db_path))
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.resolve(&self.toml.notify.outbox_dir)
    }

    pub fn checker_cmd(&self) -> String {
        self.toml.checker_cmd()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.validator_dir.join(path)
        }
    }
}
