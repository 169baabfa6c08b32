//! Plugin entry store, audit log and re-import queue backed by SQLite.
//!
//! Registry membership is a taxonomy section on the entry (by default `block`).
//! The traits below are the seams the membership gate talks to; [`RegistryDb`]
//! implements all of them over one connection.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// Default taxonomy section that marks Block Directory membership.
pub const BLOCK_SECTION: &str = "block";

/// A plugin entry known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub author_email: Option<String>,
    pub stable_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub entry_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Context passed along with a re-import request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    pub changed_revisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedImport {
    pub id: i64,
    pub slug: String,
    pub context: ImportContext,
    pub queued_at: DateTime<Utc>,
}

pub trait EntryStore {
    fn get_entry(&self, slug: &str) -> Result<Option<Entry>>;

    fn is_member(&self, entry: &Entry) -> Result<bool>;

    /// Set membership and append `audit_message` to the audit log as one unit.
    /// Either both persist or neither does.
    ///
    /// Returns false, with nothing written, when the entry was already in the
    /// requested state.
    fn set_membership(&self, entry: &Entry, member: bool, audit_message: &str) -> Result<bool>;

    /// Atomically record `marker` for the entry. Returns true only for the call
    /// that created it.
    fn claim_marker(&self, entry: &Entry, marker: &str) -> Result<bool>;
}

pub trait AuditLog {
    fn record(&self, message: &str, entry_id: i64) -> Result<()>;

    fn records_for(&self, entry_id: i64) -> Result<Vec<AuditRecord>>;
}

pub trait ReindexTrigger {
    fn enqueue(&self, slug: &str, context: &ImportContext) -> Result<()>;
}

pub struct RegistryDb {
    conn: Connection,
    section: String,
}

impl RegistryDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open registry database at {}", path.display()))?;
        let db = Self {
            conn,
            section: BLOCK_SECTION.to_string(),
        };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self {
            conn,
            section: BLOCK_SECTION.to_string(),
        };
        db.init()?;
        Ok(db)
    }

    /// Use a different taxonomy section as the membership marker.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    slug TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    author_email TEXT,
                    stable_tag TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS entry_sections (
                    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
                    section TEXT NOT NULL,
                    PRIMARY KEY (entry_id, section)
                );

                CREATE TABLE IF NOT EXISTS entry_markers (
                    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
                    marker TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (entry_id, marker)
                );

                CREATE TABLE IF NOT EXISTS audit_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
                    message TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS import_queue (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    slug TEXT NOT NULL,
                    context TEXT NOT NULL DEFAULT '{}',
                    queued_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_audit_log_entry ON audit_log(entry_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    pub fn create_entry(
        &self,
        slug: &str,
        title: &str,
        author_email: Option<&str>,
        stable_tag: Option<&str>,
    ) -> Result<Entry> {
        self.conn
            .execute(
                "INSERT INTO entries (slug, title, author_email, stable_tag) VALUES (?1, ?2, ?3, ?4)",
                params![slug, title, author_email, stable_tag],
            )
            .with_context(|| format!("Failed to create entry '{slug}'"))?;
        Ok(Entry {
            id: self.conn.last_insert_rowid(),
            slug: slug.to_string(),
            title: title.to_string(),
            author_email: author_email.map(str::to_string),
            stable_tag: stable_tag.map(str::to_string),
        })
    }

    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, slug, title, author_email, stable_tag FROM entries ORDER BY slug",
        )?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Sections assigned to an entry, sorted by name.
    pub fn sections_for(&self, entry_id: i64) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT section FROM entry_sections WHERE entry_id = ?1 ORDER BY section")?;
        let sections = stmt
            .query_map(params![entry_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(sections)
    }

    pub fn has_marker(&self, entry_id: i64, marker: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM entry_markers WHERE entry_id = ?1 AND marker = ?2",
                params![entry_id, marker],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn pending_imports(&self) -> Result<Vec<QueuedImport>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, slug, context, queued_at FROM import_queue ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, slug, context, queued_at)| {
                Ok(QueuedImport {
                    id,
                    slug,
                    context: serde_json::from_str(&context)
                        .context("Failed to parse import context")?,
                    queued_at: parse_timestamp(&queued_at)?,
                })
            })
            .collect()
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        slug: row.get(1)?,
        title: row.get(2)?,
        author_email: row.get(3)?,
        stable_tag: row.get(4)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp '{raw}'"))?
        .with_timezone(&Utc))
}

impl EntryStore for RegistryDb {
    fn get_entry(&self, slug: &str) -> Result<Option<Entry>> {
        self.conn
            .query_row(
                "SELECT id, slug, title, author_email, stable_tag FROM entries WHERE slug = ?1",
                params![slug],
                row_to_entry,
            )
            .optional()
            .with_context(|| format!("Failed to look up entry '{slug}'"))
    }

    fn is_member(&self, entry: &Entry) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM entry_sections WHERE entry_id = ?1 AND section = ?2",
                params![entry.id, self.section],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn set_membership(&self, entry: &Entry, member: bool, audit_message: &str) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin membership transaction")?;
        let changed = if member {
            tx.execute(
                "INSERT OR IGNORE INTO entry_sections (entry_id, section) VALUES (?1, ?2)",
                params![entry.id, self.section],
            )
            .context("Failed to add membership section")?
        } else {
            tx.execute(
                "DELETE FROM entry_sections WHERE entry_id = ?1 AND section = ?2",
                params![entry.id, self.section],
            )
            .context("Failed to remove membership section")?
        };
        if changed == 0 {
            tx.rollback().context("Failed to roll back membership change")?;
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO audit_log (entry_id, message, created_at) VALUES (?1, ?2, ?3)",
            params![entry.id, audit_message, Utc::now().to_rfc3339()],
        )
        .context("Failed to write audit record")?;
        tx.commit().context("Failed to commit membership change")?;
        Ok(true)
    }

    fn claim_marker(&self, entry: &Entry, marker: &str) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO entry_markers (entry_id, marker, created_at) VALUES (?1, ?2, ?3)",
                params![entry.id, marker, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to claim marker '{marker}'"))?;
        Ok(inserted == 1)
    }
}

impl AuditLog for RegistryDb {
    fn record(&self, message: &str, entry_id: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO audit_log (entry_id, message, created_at) VALUES (?1, ?2, ?3)",
                params![entry_id, message, Utc::now().to_rfc3339()],
            )
            .context("Failed to write audit record")?;
        Ok(())
    }

    fn records_for(&self, entry_id: i64) -> Result<Vec<AuditRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, entry_id, message, created_at FROM audit_log WHERE entry_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![entry_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, entry_id, message, created_at)| {
                Ok(AuditRecord {
                    id,
                    entry_id,
                    message,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}

impl ReindexTrigger for RegistryDb {
    fn enqueue(&self, slug: &str, context: &ImportContext) -> Result<()> {
        let context =
            serde_json::to_string(context).context("Failed to serialize import context")?;
        self.conn
            .execute(
                "INSERT INTO import_queue (slug, context, queued_at) VALUES (?1, ?2, ?3)",
                params![slug, context, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to queue import for '{slug}'"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_entry() -> Result<(RegistryDb, Entry)> {
        let db = RegistryDb::new_in_memory()?;
        let entry = db.create_entry("my-block", "My Block", Some("dev@example.com"), Some("1.2.0"))?;
        Ok((db, entry))
    }

    #[test]
    fn test_create_and_get_entry() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        let loaded = db.get_entry("my-block")?.expect("entry should exist");
        assert_eq!(loaded, entry);
        assert!(db.get_entry("missing")?.is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_slug_is_rejected() -> Result<()> {
        let (db, _) = db_with_entry()?;
        assert!(db.create_entry("my-block", "Again", None, None).is_err());
        Ok(())
    }

    #[test]
    fn test_set_membership_writes_section_and_audit() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        assert!(!db.is_member(&entry)?);

        assert!(db.set_membership(&entry, true, "Plugin added to block directory.")?);
        assert!(db.is_member(&entry)?);
        assert_eq!(db.sections_for(entry.id)?, vec!["block".to_string()]);

        assert!(db.set_membership(&entry, false, "Plugin removed from block directory.")?);
        assert!(!db.is_member(&entry)?);

        let messages: Vec<String> = db
            .records_for(entry.id)?
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Plugin added to block directory.",
                "Plugin removed from block directory."
            ]
        );
        Ok(())
    }

    #[test]
    fn test_membership_leaves_other_sections_alone() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        db.conn.execute(
            "INSERT INTO entry_sections (entry_id, section) VALUES (?1, 'featured')",
            params![entry.id],
        )?;
        db.set_membership(&entry, true, "added")?;
        db.set_membership(&entry, false, "removed")?;
        assert_eq!(db.sections_for(entry.id)?, vec!["featured".to_string()]);
        Ok(())
    }

    #[test]
    fn test_failed_membership_write_leaves_no_partial_state() -> Result<()> {
        let (db, _) = db_with_entry()?;
        // Entry that was never inserted: every write violates the foreign key.
        let ghost = Entry {
            id: 999,
            slug: "ghost".to_string(),
            title: "Ghost".to_string(),
            author_email: None,
            stable_tag: None,
        };
        assert!(db.set_membership(&ghost, true, "added").is_err());
        assert!(!db.is_member(&ghost)?);
        assert!(db.records_for(ghost.id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_claim_marker_succeeds_once() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        assert!(!db.has_marker(entry.id, "added_to_block_directory")?);
        assert!(db.claim_marker(&entry, "added_to_block_directory")?);
        assert!(!db.claim_marker(&entry, "added_to_block_directory")?);
        assert!(db.has_marker(entry.id, "added_to_block_directory")?);
        assert!(db.claim_marker(&entry, "other_marker")?);
        Ok(())
    }

    #[test]
    fn test_set_membership_noop_writes_no_audit() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        assert!(!db.set_membership(&entry, false, "removed")?);
        assert!(db.set_membership(&entry, true, "added")?);
        assert!(!db.set_membership(&entry, true, "added")?);

        let messages: Vec<String> = db
            .records_for(entry.id)?
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["added"]);
        Ok(())
    }

    #[test]
    fn test_concurrent_adds_from_two_connections_write_once() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("registry.db");
        let a = RegistryDb::new(&path)?;
        let b = RegistryDb::new(&path)?;
        let entry = a.create_entry("my-block", "My Block", None, None)?;

        // Both connections observe a non-member before either writes.
        assert!(!a.is_member(&entry)?);
        assert!(!b.is_member(&entry)?);

        let first = a.set_membership(&entry, true, "added")?;
        let second = b.set_membership(&entry, true, "added")?;
        assert!(first);
        assert!(!second);
        assert_eq!(a.records_for(entry.id)?.len(), 1);
        assert_eq!(b.sections_for(entry.id)?, vec!["block".to_string()]);
        Ok(())
    }

    #[test]
    fn test_claim_marker_from_two_connections_succeeds_once() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("registry.db");
        let a = RegistryDb::new(&path)?;
        let b = RegistryDb::new(&path)?;
        let entry = a.create_entry("my-block", "My Block", Some("dev@example.com"), None)?;

        let claims = [
            a.claim_marker(&entry, "added_to_block_directory")?,
            b.claim_marker(&entry, "added_to_block_directory")?,
        ];
        assert_eq!(claims.iter().filter(|claimed| **claimed).count(), 1);
        assert!(b.has_marker(entry.id, "added_to_block_directory")?);
        Ok(())
    }

    #[test]
    fn test_custom_section() -> Result<()> {
        let db = RegistryDb::new_in_memory()?.with_section("blocks-beta");
        let entry = db.create_entry("x", "X", None, None)?;
        db.set_membership(&entry, true, "added")?;
        assert_eq!(db.sections_for(entry.id)?, vec!["blocks-beta".to_string()]);
        Ok(())
    }

    #[test]
    fn test_enqueue_import() -> Result<()> {
        let (db, _) = db_with_entry()?;
        db.enqueue(
            "my-block",
            &ImportContext {
                changed_revisions: vec!["1.2.0".to_string()],
            },
        )?;
        let queued = db.pending_imports()?;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].slug, "my-block");
        assert_eq!(queued[0].context.changed_revisions, vec!["1.2.0"]);
        Ok(())
    }

    #[test]
    fn test_audit_record_direct() -> Result<()> {
        let (db, entry) = db_with_entry()?;
        db.record("Manual note", entry.id)?;
        let records = db.records_for(entry.id)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "Manual note");
        Ok(())
    }

    #[test]
    fn test_list_entries_sorted_by_slug() -> Result<()> {
        let db = RegistryDb::new_in_memory()?;
        db.create_entry("zeta", "Zeta", None, None)?;
        db.create_entry("alpha", "Alpha", None, None)?;
        let slugs: Vec<String> = db.list_entries()?.into_iter().map(|e| e.slug).collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
        Ok(())
    }

    #[test]
    fn test_open_file_database_persists() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("registry.db");
        {
            let db = RegistryDb::new(&path)?;
            let entry = db.create_entry("my-block", "My Block", None, None)?;
            db.set_membership(&entry, true, "added")?;
        }
        let db = RegistryDb::new(&path)?;
        let entry = db.get_entry("my-block")?.expect("entry should persist");
        assert!(db.is_member(&entry)?);
        Ok(())
    }
}
