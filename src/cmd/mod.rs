//! CLI command implementations.
//!
//! | Module      | Commands handled          |
//! |-------------|---------------------------|
//! | `project`   | `Init`                    |
//! | `validate`  | `Validate`                |
//! | `entry`     | `Entry`, `Audit`          |
//! | `config`    | `Config`                  |

pub mod config;
pub mod entry;
pub mod project;
pub mod validate;

pub use config::cmd_config;
pub use entry::{cmd_audit, cmd_entry};
pub use project::cmd_init;
pub use validate::cmd_validate;

use anyhow::{Context, Result};
use std::path::Path;

use block_validator::registry::RegistryDb;
use block_validator::validator_config::ValidatorConfig;

use crate::Cli;

/// Load configuration with the CLI overrides applied.
fn load_config(project_dir: &Path, cli: &Cli) -> Result<ValidatorConfig> {
    ValidatorConfig::with_cli_args(project_dir.to_path_buf(), cli.db.clone())
}

/// Open the registry database, creating its directory if needed.
fn open_registry(config: &ValidatorConfig) -> Result<RegistryDb> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(RegistryDb::new(&db_path)?.with_section(config.toml.registry.section.clone()))
}
