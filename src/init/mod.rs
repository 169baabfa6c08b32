//! Project scaffolding for `block-validator init`.
//!
//! Creates the `.block-validator/` directory in a project:
//!
//! ```text
//! .block-validator/
//! ├── validator.toml   # Configuration (defaults written on first init)
//! ├── registry.db      # Created on first use of the registry
//! └── outbox/          # Queued author notifications
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::validator_config::{CONFIG_FILE, ValidatorToml};

/// The name of the validator's project directory.
pub const VALIDATOR_DIR: &str = ".block-validator";

#[derive(Debug)]
pub struct InitResult {
    pub validator_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Whether a default `validator.toml` was written
    pub wrote_config: bool,
}

/// Initialize a project in the given directory.
///
/// Existing files are never overwritten; running init twice only fills in
/// whatever is missing.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let validator_dir = project_dir.join(VALIDATOR_DIR);
    let created = !validator_dir.exists();

    std::fs::create_dir_all(&validator_dir)
        .with_context(|| format!("Failed to create directory: {}", validator_dir.display()))?;

    let config_path = validator_dir.join(CONFIG_FILE);
    let wrote_config = if config_path.exists() {
        false
    } else {
        ValidatorToml::default().save(&config_path)?;
        true
    };

    // The outbox location may have been customised in an existing config.
    let toml = ValidatorToml::load(&config_path)?;
    let outbox_dir = if toml.notify.outbox_dir.is_absolute() {
        toml.notify.outbox_dir.clone()
    } else {
        validator_dir.join(&toml.notify.outbox_dir)
    };
    std::fs::create_dir_all(&outbox_dir)
        .with_context(|| format!("Failed to create outbox: {}", outbox_dir.display()))?;

    tracing::info!(dir = %validator_dir.display(), created, "Initialized project");

    Ok(InitResult {
        validator_dir,
        created,
        wrote_config,
    })
}

pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(VALIDATOR_DIR).join(CONFIG_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_project_creates_layout() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();

        assert!(result.created);
        assert!(result.wrote_config);
        assert_eq!(result.validator_dir, dir.path().join(".block-validator"));
        assert!(result.validator_dir.join("validator.toml").is_file());
        assert!(result.validator_dir.join("outbox").is_dir());
        assert!(is_initialized(dir.path()));
    }

    #[test]
    fn test_init_project_writes_loadable_defaults() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();

        let toml =
            ValidatorToml::load(&dir.path().join(".block-validator/validator.toml")).unwrap();
        assert_eq!(toml.report.collapse_check, "block-json-schema");
        assert_eq!(toml.registry.section, "block");
    }

    #[test]
    fn test_init_project_twice_keeps_existing_config() {
        let dir = tempdir().unwrap();
        let validator_dir = dir.path().join(".block-validator");
        std::fs::create_dir_all(&validator_dir).unwrap();
        std::fs::write(
            validator_dir.join("validator.toml"),
            "[notify]\noutbox_dir = \"mail\"\n",
        )
        .unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.created);
        assert!(!result.wrote_config);
        assert!(validator_dir.join("mail").is_dir());

        let content = std::fs::read_to_string(validator_dir.join("validator.toml")).unwrap();
        assert_eq!(content, "[notify]\noutbox_dir = \"mail\"\n");
    }

    #[test]
    fn test_is_initialized_false_for_new_project() {
        let dir = tempdir().unwrap();
        assert!(!is_initialized(dir.path()));
    }
}
