//! Project initialization command.

use anyhow::Result;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use block_validator::init::init_project;

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized block validator at {}",
            result.validator_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .block-validator/");
        println!("  ├── validator.toml  # Checker, registry and notification settings");
        println!("  └── outbox/         # Queued author notifications");
        println!();
        println!("Next steps:");
        println!("  1. Set [checker] command in validator.toml");
        println!("  2. Register plugins with `block-validator entry add <slug> --title <title>`");
        println!("  3. Run `block-validator validate <repo>`");
    } else if result.wrote_config {
        println!(
            "Completed block validator initialization at {}",
            result.validator_dir.display()
        );
    } else {
        println!(
            "Block validator already initialized at {}",
            result.validator_dir.display()
        );
        println!("Directory structure verified.");
    }

    Ok(())
}
