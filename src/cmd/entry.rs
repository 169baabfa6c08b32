//! Registry entry management and audit log commands.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use block_validator::notify::ADDED_MARKER;
use block_validator::registry::{AuditLog, Entry, EntryStore, RegistryDb};

use super::{load_config, open_registry};
use crate::{Cli, EntryCommands};

pub fn cmd_entry(project_dir: &Path, cli: &Cli, command: &EntryCommands) -> Result<()> {
    let config = load_config(project_dir, cli)?;
    let db = open_registry(&config)?;

    match command {
        EntryCommands::Add {
            slug,
            title,
            author_email,
            stable_tag,
        } => {
            let entry = db.create_entry(
                slug,
                title,
                author_email.as_deref(),
                stable_tag.as_deref(),
            )?;
            println!("Added entry {} (id {})", style(&entry.slug).bold(), entry.id);
        }
        EntryCommands::Show { slug } => {
            let entry = find_entry(&db, slug)?;
            print_entry(&db, &entry)?;
        }
        EntryCommands::List => {
            let entries = db.list_entries()?;
            if entries.is_empty() {
                println!("No entries registered.");
                return Ok(());
            }
            for entry in entries {
                let member = if db.is_member(&entry)? {
                    style(format!("[{}]", db.section())).green().to_string()
                } else {
                    String::new()
                };
                println!("{:<32} {} {}", entry.slug, entry.title, member);
            }
        }
    }

    Ok(())
}

pub fn cmd_audit(project_dir: &Path, cli: &Cli, slug: &str) -> Result<()> {
    let config = load_config(project_dir, cli)?;
    let db = open_registry(&config)?;
    let entry = find_entry(&db, slug)?;

    let records = db.records_for(entry.id)?;
    if records.is_empty() {
        println!("No audit records for {slug}.");
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {}",
            style(record.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            record.message
        );
    }
    Ok(())
}

fn find_entry(db: &RegistryDb, slug: &str) -> Result<Entry> {
    db.get_entry(slug)?
        .with_context(|| format!("No plugin entry found for '{slug}'"))
}

fn print_entry(db: &RegistryDb, entry: &Entry) -> Result<()> {
    println!("{}", style(&entry.title).bold());
    println!("  slug:         {}", entry.slug);
    println!("  id:           {}", entry.id);
    println!(
        "  author email: {}",
        entry.author_email.as_deref().unwrap_or("-")
    );
    println!(
        "  stable tag:   {}",
        entry.stable_tag.as_deref().unwrap_or("-")
    );
    println!("  member:       {}", yes_no(db.is_member(entry)?));
    println!("  sections:     {}", db.sections_for(entry.id)?.join(", "));
    println!(
        "  added email:  {}",
        if db.has_marker(entry.id, ADDED_MARKER)? {
            "sent"
        } else {
            "not sent"
        }
    );
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
