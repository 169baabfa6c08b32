//! Per-actor review tooling shown next to a report.
//!
//! Tooling is a view derived from capabilities; the membership rules in the
//! parent module never consult it.

use serde::Serialize;

use super::{Capability, CapabilitySet};
use crate::report::Decision;
use crate::validator_config::LinksSection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolLink {
    pub label: &'static str,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewTools {
    pub heading: &'static str,
    pub links: Vec<ToolLink>,
}

impl ReviewTools {
    /// Tooling for an actor looking at entry `entry_id` (`slug`).
    ///
    /// Edit-entry holders get the review tools including the edit link;
    /// plugin-admin holders without it get the committer tools only.
    pub fn for_actor(
        capabilities: &CapabilitySet,
        slug: &str,
        entry_id: i64,
        links: &LinksSection,
    ) -> Option<Self> {
        let trac = format!("{}/browser/{}/trunk", links.trac_url.trim_end_matches('/'), slug);

        if capabilities.contains(&Capability::EditEntry) {
            Some(Self {
                heading: "Plugin Review Tools",
                links: vec![
                    ToolLink {
                        label: "Edit plugin",
                        href: format!(
                            "{}/post.php?post={}&action=edit",
                            links.admin_url.trim_end_matches('/'),
                            entry_id
                        ),
                    },
                    ToolLink {
                        label: "Trac browser",
                        href: trac,
                    },
                ],
            })
        } else if capabilities.contains(&Capability::PluginAdmin) {
            Some(Self {
                heading: "Committer Tools",
                links: vec![ToolLink {
                    label: "Browse code on trac",
                    href: trac,
                }],
            })
        } else {
            None
        }
    }

    pub fn has_link(&self, label: &str) -> bool {
        self.links.iter().any(|l| l.label == label)
    }
}

/// The Add/Remove control offered to an authorized actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum MembershipControl {
    /// Errors prevent adding the entry.
    Blocked(String),
    Add(String),
    Remove(String),
}

impl MembershipControl {
    pub fn for_entry(
        capabilities: &CapabilitySet,
        title: &str,
        decision: Decision,
        is_member: bool,
    ) -> Option<Self> {
        if !capabilities.can_manage() {
            return None;
        }
        let control = if !decision.accepts() {
            Self::Blocked(format!(
                "{title} can't be added to the block directory, due to errors in validation."
            ))
        } else if is_member {
            Self::Remove(format!("Remove {title} from Block Directory"))
        } else {
            Self::Add(format!("Add {title} to Block Directory"))
        };
        Some(control)
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Blocked(text) | Self::Add(text) | Self::Remove(text) => text,
        }
    }
}
