//! Registry membership gate.
//!
//! Decides whether an actor may add a plugin entry to, or remove it from, the
//! Block Directory, and applies the change. The rules live in
//! [`plan_transition`], which is pure; [`MembershipGate`] carries out the plan
//! against the entry store, notifier and re-index queue.
//!
//! Add and Remove are idempotent. Only a successful Add sends the author the
//! "added" email, and only ever once per entry.

pub mod tools;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::GateError;
use crate::notify::{ADDED_MARKER, Notifier, added_email, send_once};
use crate::registry::{Entry, EntryStore, ImportContext, ReindexTrigger};
use crate::report::Decision;
use crate::validator_config::NotifySection;

pub use tools::{MembershipControl, ReviewTools, ToolLink};

pub const AUDIT_ADDED: &str = "Plugin added to block directory.";
pub const AUDIT_REMOVED: &str = "Plugin removed from block directory.";

/// A permission held by the requesting actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// May edit the plugin entry (reviewers, plugin owners).
    EditEntry,
    /// May administer the plugin listing (committers).
    PluginAdmin,
    Other(String),
}

impl Capability {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EditEntry => "edit-entry",
            Self::PluginAdmin => "plugin-admin",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for Capability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => anyhow::bail!("Capability must not be empty"),
            "edit-entry" | "edit_post" => Ok(Self::EditEntry),
            "plugin-admin" | "plugin_admin_edit" => Ok(Self::PluginAdmin),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.0.contains(capability)
    }

    /// Either load-bearing capability authorizes membership changes.
    pub fn can_manage(&self) -> bool {
        self.contains(&Capability::EditEntry) || self.contains(&Capability::PluginAdmin)
    }

}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipAction {
    #[default]
    None,
    Add,
    Remove,
}

impl FromStr for MembershipAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => anyhow::bail!("Unknown membership action '{other}'. Use add or remove"),
        }
    }
}

/// What the gate decided to do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// No action was requested.
    ReadOnly,
    /// The entry is already in the requested state.
    Unchanged,
    Add,
    Remove,
}

/// Apply the membership rules. The first matching rule wins.
pub fn plan_transition(
    capabilities: &CapabilitySet,
    current_membership: bool,
    decision: Decision,
    action: MembershipAction,
) -> Result<Transition, GateError> {
    if !capabilities.can_manage() {
        return Err(GateError::Unauthorized);
    }

    let transition = match action {
        MembershipAction::None => Transition::ReadOnly,
        MembershipAction::Add if !decision.accepts() => return Err(GateError::BlockedByErrors),
        MembershipAction::Add if current_membership => Transition::Unchanged,
        MembershipAction::Add => Transition::Add,
        MembershipAction::Remove if current_membership => Transition::Remove,
        MembershipAction::Remove => Transition::Unchanged,
    };
    Ok(transition)
}

/// Result of an accepted membership request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub transition: Transition,
    /// Membership after the request.
    pub is_member: bool,
    /// Whether the "added" email was sent by this request.
    pub notified: bool,
    pub reindex_queued: bool,
    /// Follow-up effects that failed after the membership change was persisted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follow_up_errors: Vec<String>,
}

impl TransitionOutcome {
    fn unchanged(transition: Transition, is_member: bool) -> Self {
        Self {
            transition,
            is_member,
            notified: false,
            reindex_queued: false,
            follow_up_errors: Vec::new(),
        }
    }
}

pub struct MembershipGate<'a> {
    store: &'a dyn EntryStore,
    notifier: &'a dyn Notifier,
    reindex: &'a dyn ReindexTrigger,
    notify: &'a NotifySection,
}

impl<'a> MembershipGate<'a> {
    pub fn new(
        store: &'a dyn EntryStore,
        notifier: &'a dyn Notifier,
        reindex: &'a dyn ReindexTrigger,
        notify: &'a NotifySection,
    ) -> Self {
        Self {
            store,
            notifier,
            reindex,
            notify,
        }
    }

    /// Plan and apply a membership request for `entry`.
    ///
    /// The membership flag and its audit record are written as one unit; if
    /// that fails nothing changed and [`GateError::StoreWriteFailure`] is
    /// returned. A write that finds the entry already in the requested state
    /// is reported as [`Transition::Unchanged`]. After an Add commits, the email and re-index request are
    /// attempted and any failure is recorded on the outcome.
    pub fn request_transition(
        &self,
        capabilities: &CapabilitySet,
        entry: &Entry,
        current_membership: bool,
        decision: Decision,
        action: MembershipAction,
    ) -> Result<TransitionOutcome, GateError> {
        let transition = match plan_transition(capabilities, current_membership, decision, action)
        {
            Ok(transition) => transition,
            Err(e) => {
                tracing::warn!(slug = %entry.slug, ?action, error = %e, "Membership request refused");
                return Err(e);
            }
        };
        tracing::info!(slug = %entry.slug, ?action, ?transition, "Membership request accepted");

        match transition {
            Transition::ReadOnly | Transition::Unchanged => {
                Ok(TransitionOutcome::unchanged(transition, current_membership))
            }
            Transition::Remove => {
                let changed = self
                    .store
                    .set_membership(entry, false, AUDIT_REMOVED)
                    .map_err(GateError::StoreWriteFailure)?;
                if !changed {
                    tracing::info!(slug = %entry.slug, "Entry was already removed");
                    return Ok(TransitionOutcome::unchanged(Transition::Unchanged, false));
                }
                Ok(TransitionOutcome::unchanged(transition, false))
            }
            Transition::Add => {
                let changed = self
                    .store
                    .set_membership(entry, true, AUDIT_ADDED)
                    .map_err(GateError::StoreWriteFailure)?;
                if !changed {
                    tracing::info!(slug = %entry.slug, "Entry was already a member");
                    return Ok(TransitionOutcome::unchanged(Transition::Unchanged, true));
                }
                Ok(self.after_add(entry))
            }
        }
    }

    fn after_add(&self, entry: &Entry) -> TransitionOutcome {
        let mut outcome = TransitionOutcome::unchanged(Transition::Add, true);

        match added_email(entry, self.notify) {
            Some(email) => {
                match send_once(self.store, self.notifier, entry, ADDED_MARKER, &email) {
                    Ok(sent) => outcome.notified = sent,
                    Err(e) => {
                        tracing::error!(slug = %entry.slug, error = %e, "Failed to send added email");
                        outcome.follow_up_errors.push(format!("notification: {e:#}"));
                    }
                }
            }
            None => {
                tracing::debug!(slug = %entry.slug, "No author email, skipping notification");
            }
        }

        let context = ImportContext {
            changed_revisions: entry.stable_tag.iter().cloned().collect(),
        };
        match self.reindex.enqueue(&entry.slug, &context) {
            Ok(()) => outcome.reindex_queued = true,
            Err(e) => {
                tracing::error!(slug = %entry.slug, error = %e, "Failed to queue re-import");
                outcome.follow_up_errors.push(format!("reindex: {e:#}"));
            }
        }

        outcome
    }
}
