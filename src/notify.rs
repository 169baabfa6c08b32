//! Author notifications.
//!
//! The gate only ever sends one email: the "added to the Block Directory"
//! letter, at most once per entry. Delivery itself is behind [`Notifier`];
//! [`OutboxNotifier`] drops each message as a JSON file into a spool directory
//! for the embedding application's mail transport to pick up.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::{Entry, EntryStore};
use crate::validator_config::NotifySection;

/// Marker recorded on an entry once the "added" email went out.
pub const ADDED_MARKER: &str = "added_to_block_directory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

pub trait Notifier {
    fn send(&self, email: &Email) -> Result<()>;
}

/// Compose the letter telling an author their plugin joined the Block Directory.
///
/// Returns `None` when the entry has no author address to send to.
pub fn added_email(entry: &Entry, settings: &NotifySection) -> Option<Email> {
    let to = entry.author_email.as_deref()?.trim();
    if to.is_empty() {
        return None;
    }

    let subject = format!(
        "[WordPress Plugin Directory] Added to Block Directory - {}",
        entry.slug
    );
    let body = format!(
        "This email is to let you know that your plugin {title} has been added to the Block Directory here: {browse}.

We're still working on improving Block Directory search and automated detection of blocks, so don't be alarmed if your block isn't immediately visible there. We've built a new tool to help developers identify problems and potential improvements to block plugins, which you'll find here: {validator}.

By being listed here, WordPress users will be able to discover your block plugin and install it directly from the editor when searching for blocks.

If you would like your plugin removed from the Block Directory, you can do so here: {validator}?plugin_url={slug}

Otherwise, you're all set!

--
The WordPress Plugin Directory Team
https://make.wordpress.org/plugins",
        title = entry.title,
        browse = settings.browse_url,
        validator = settings.validator_url,
        slug = entry.slug,
    );

    Some(Email {
        to: to.to_string(),
        from: settings.from.clone(),
        subject,
        body,
    })
}

/// Send `email` unless `marker` was already recorded for the entry.
///
/// The marker claim is the linearization point: of any number of concurrent
/// callers, only the one that creates the marker sends. A send that fails after
/// the claim is not retried.
pub fn send_once(
    store: &dyn EntryStore,
    notifier: &dyn Notifier,
    entry: &Entry,
    marker: &str,
    email: &Email,
) -> Result<bool> {
    if !store.claim_marker(entry, marker)? {
        tracing::debug!(slug = %entry.slug, marker, "Notification already sent, skipping");
        return Ok(false);
    }
    notifier.send(email)?;
    tracing::info!(slug = %entry.slug, to = %email.to, "Sent notification");
    Ok(true)
}

#[derive(Debug, Serialize, Deserialize)]
struct OutboxMessage {
    queued_at: DateTime<Utc>,
    #[serde(flatten)]
    email: Email,
}

/// Writes each email as a JSON file into an outbox directory.
pub struct OutboxNotifier {
    outbox_dir: PathBuf,
}

impl OutboxNotifier {
    pub fn new(outbox_dir: &Path) -> Self {
        Self {
            outbox_dir: outbox_dir.to_path_buf(),
        }
    }

    /// List queued messages, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.outbox_dir.exists() {
            return Ok(Vec::new());
        }
        let mut messages: Vec<PathBuf> = fs::read_dir(&self.outbox_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        messages.sort();
        Ok(messages)
    }

    pub fn load(&self, path: &Path) -> Result<Email> {
        let content = fs::read_to_string(path).context("Failed to read outbox message")?;
        let message: OutboxMessage =
            serde_json::from_str(&content).context("Failed to parse outbox message")?;
        Ok(message.email)
    }
}

impl Notifier for OutboxNotifier {
    fn send(&self, email: &Email) -> Result<()> {
        fs::create_dir_all(&self.outbox_dir).context("Failed to create outbox directory")?;
        let message = OutboxMessage {
            queued_at: Utc::now(),
            email: email.clone(),
        };
        let filename = format!(
            "{}_{}.json",
            message.queued_at.format("%Y-%m-%dT%H-%M-%S%.6f"),
            &Uuid::new_v4().to_string()[..8]
        );
        let json =
            serde_json::to_string_pretty(&message).context("Failed to serialize email")?;
        fs::write(self.outbox_dir.join(filename), json)
            .context("Failed to write outbox message")?;
        Ok(())
    }
}
