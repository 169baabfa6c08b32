//! `block-validator validate`: run the checker, apply a membership action, print.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use block_validator::checker::{Checker, JsonFileChecker, ProcessChecker};
use block_validator::gate::{Capability, CapabilitySet, MembershipAction, MembershipControl};
use block_validator::notify::OutboxNotifier;
use block_validator::report::escape_html;
use block_validator::service::{ValidationRequest, ValidationResponse, Validator};

use super::{load_config, open_registry};
use crate::{Cli, OutputFormat};

pub fn cmd_validate(
    project_dir: &Path,
    cli: &Cli,
    repo: &str,
    results_file: Option<&Path>,
    format: OutputFormat,
    capabilities: &[String],
    action: Option<&str>,
) -> Result<()> {
    let config = load_config(project_dir, cli)?;
    let collapse = config
        .toml
        .collapse_check()
        .context("Invalid [report] collapse_check in validator.toml")?;

    let capabilities = capabilities
        .iter()
        .map(|c| c.parse::<Capability>())
        .collect::<Result<CapabilitySet>>()?;
    let action = match action {
        Some(action) => action.parse::<MembershipAction>()?,
        None => MembershipAction::None,
    };

    let checker: Box<dyn Checker> = match results_file {
        Some(path) => Box::new(JsonFileChecker::new(path)),
        None => Box::new(
            ProcessChecker::new(config.checker_cmd(), config.toml.checker.args.clone())
                .with_working_dir(&config.project_dir),
        ),
    };
    let db = open_registry(&config)?;
    let outbox = OutboxNotifier::new(&config.outbox_dir());

    let validator = Validator::new(&*checker, &db, &outbox, &db)
        .with_collapse_check(collapse)
        .with_notify(config.toml.notify.clone())
        .with_links(config.toml.links.clone());

    let mut response = validator.validate(&ValidationRequest {
        repo: repo.to_string(),
        capabilities,
        action,
    })?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Html => print!("{}", response_html(&response)),
        OutputFormat::Text => print_text(&response),
    }

    if let Some(refusal) = response.refusal.take() {
        return Err(refusal.into());
    }
    Ok(())
}

fn print_text(response: &ValidationResponse) {
    print!("{}", response.report);

    if let Some(outcome) = &response.transition {
        println!();
        println!(
            "{} {:?}, member: {}",
            style("Membership:").bold(),
            outcome.transition,
            outcome.is_member
        );
        if outcome.notified {
            println!("  Author notified.");
        }
        if outcome.reindex_queued {
            println!("  Re-import queued.");
        }
        for error in &outcome.follow_up_errors {
            println!("  {} {error}", style("Follow-up failed:").yellow());
        }
    }

    if let Some(tools) = &response.tools {
        println!();
        println!("{}", style(tools.heading).bold());
        for link in &tools.links {
            println!("  {}: {}", link.label, style(&link.href).cyan());
        }
    }

    if let Some(control) = &response.control {
        println!();
        match control {
            MembershipControl::Blocked(text) => println!("{}", style(text).red()),
            MembershipControl::Add(text) | MembershipControl::Remove(text) => {
                println!("Available action: {text}")
            }
        }
    }
}

fn response_html(response: &ValidationResponse) -> String {
    let mut out = response.report.to_html();

    if let Some(tools) = &response.tools {
        out.push_str(&format!("<h3>{}</h3>\n<ul>\n", tools.heading));
        for link in &tools.links {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape_html(&link.href),
                link.label
            ));
        }
        out.push_str("</ul>\n");
    }

    if let Some(control) = &response.control {
        let html = match control {
            MembershipControl::Blocked(text) => escape_html(text),
            MembershipControl::Add(text) => format!(
                "<button class=\"button button-primary button-large\" type=\"submit\" name=\"block-directory-edit\" value=\"add\">{}</button>",
                escape_html(text)
            ),
            MembershipControl::Remove(text) => format!(
                "<button class=\"button button-secondary button-large\" type=\"submit\" name=\"block-directory-edit\" value=\"remove\">{}</button>",
                escape_html(text)
            ),
        };
        out.push_str(&format!("<p>{html}</p>\n"));
    }
    out
}
