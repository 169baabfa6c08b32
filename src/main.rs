use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "block-validator")]
#[command(version, about = "Validate block plugins and manage Block Directory membership")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Registry database path. Overrides BLOCK_VALIDATOR_DB and validator.toml.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a .block-validator directory in the project
    Init,
    /// Check a plugin repository and print the report
    Validate {
        /// Repository URL or plugin slug
        repo: String,

        /// Read checker results from a JSON file instead of running the checker
        #[arg(long)]
        results_file: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Capability held by the actor (edit-entry, plugin-admin). Repeatable.
        #[arg(long = "capability")]
        capabilities: Vec<String>,

        /// Membership change to request: add or remove
        #[arg(long)]
        action: Option<String>,
    },
    /// Manage plugin entries in the registry
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
    /// Show the audit log of a plugin entry
    Audit { slug: String },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Html,
    Json,
}

#[derive(Subcommand, Clone)]
pub enum EntryCommands {
    /// Register a plugin entry
    Add {
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author_email: Option<String>,
        #[arg(long)]
        stable_tag: Option<String>,
    },
    /// Show an entry with its membership and sections
    Show { slug: String },
    /// List all entries
    List,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default validator.toml file
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    block_validator::logging::init(cli.verbose, cli.log_json)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Validate {
            repo,
            results_file,
            format,
            capabilities,
            action,
        } => cmd::cmd_validate(
            &project_dir,
            &cli,
            repo,
            results_file.as_deref(),
            *format,
            capabilities,
            action.as_deref(),
        )?,
        Commands::Entry { command } => cmd::cmd_entry(&project_dir, &cli, command)?,
        Commands::Audit { slug } => cmd::cmd_audit(&project_dir, &cli, slug)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
