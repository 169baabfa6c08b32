//! Configuration view and validation commands for `block-validator config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use block_validator::init::VALIDATOR_DIR;
    use block_validator::validator_config::{CONFIG_FILE, ValidatorConfig, ValidatorToml};

    let validator_dir = project_dir.join(VALIDATOR_DIR);
    let config_path = validator_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Block Validator Configuration");
            println!("=============================");
            println!();

            let file = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                ValidatorToml::load(&config_path)?
            } else {
                println!("No validator.toml found at {}", config_path.display());
                println!("Using default configuration.");
                ValidatorToml::default()
            };
            println!();
            print!("{}", toml::to_string_pretty(&file)?);
            println!();

            println!("Effective values (with env/CLI overrides):");
            let config = ValidatorConfig::new(project_dir.to_path_buf())?;
            println!("  checker command = \"{}\"", config.checker_cmd());
            println!("  registry db = \"{}\"", config.db_path().display());
            println!("  outbox = \"{}\"", config.outbox_dir().display());
            println!();

            if !config_path.exists() {
                println!("Run 'block-validator config init' to create a validator.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No validator.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = ValidatorToml::load(&config_path)?.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
                println!();
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
                println!();
                anyhow::bail!("Configuration has {} problem(s)", warnings.len());
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("validator.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !validator_dir.exists() {
                std::fs::create_dir_all(&validator_dir)?;
            }

            ValidatorToml::default().save(&config_path)?;

            println!("Created validator.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [checker] command, args");
            println!("  - [report] collapse_check");
            println!("  - [registry] db_path, section");
            println!("  - [notify] and [links] URLs");
            println!();
        }
    }

    Ok(())
}
