//! The validator entry point used by presentation layers.
//!
//! [`Validator::validate`] takes a repository location, the actor's
//! capabilities and an optional membership action, and returns everything a
//! page or CLI needs: the rendered report, the actor's tooling and control,
//! and the outcome of the membership request.

use anyhow::Result;
use serde::{Serialize, Serializer};

use crate::check::CheckId;
use crate::checker::Checker;
use crate::errors::GateError;
use crate::gate::{
    CapabilitySet, MembershipAction, MembershipControl, MembershipGate, ReviewTools,
    TransitionOutcome,
};
use crate::notify::Notifier;
use crate::registry::{Entry, EntryStore, ReindexTrigger};
use crate::report::{RenderedReport, Report};
use crate::validator_config::{LinksSection, NotifySection};

#[derive(Debug, Clone, Default)]
pub struct ValidationRequest {
    /// Repository URL or plugin slug handed to the checker.
    pub repo: String,
    pub capabilities: CapabilitySet,
    pub action: MembershipAction,
}

impl ValidationRequest {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub report: RenderedReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ReviewTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<MembershipControl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionOutcome>,
    /// Why the requested membership change was not applied.
    #[serde(
        serialize_with = "serialize_refusal",
        skip_serializing_if = "Option::is_none"
    )]
    pub refusal: Option<GateError>,
    #[serde(skip)]
    pub entry: Option<Entry>,
}

impl ValidationResponse {
    pub fn is_refused(&self) -> bool {
        self.refusal.is_some()
    }
}

fn serialize_refusal<S: Serializer>(refusal: &Option<GateError>, s: S) -> Result<S::Ok, S::Error> {
    match refusal {
        Some(e) => s.serialize_some(&e.to_string()),
        None => s.serialize_none(),
    }
}

pub struct Validator<'a> {
    checker: &'a dyn Checker,
    store: &'a dyn EntryStore,
    notifier: &'a dyn Notifier,
    reindex: &'a dyn ReindexTrigger,
    collapse: CheckId,
    notify: NotifySection,
    links: LinksSection,
}

impl<'a> Validator<'a> {
    pub fn new(
        checker: &'a dyn Checker,
        store: &'a dyn EntryStore,
        notifier: &'a dyn Notifier,
        reindex: &'a dyn ReindexTrigger,
    ) -> Self {
        Self {
            checker,
            store,
            notifier,
            reindex,
            collapse: CheckId::BlockJsonSchema,
            notify: NotifySection::default(),
            links: LinksSection::default(),
        }
    }

    pub fn with_collapse_check(mut self, collapse: CheckId) -> Self {
        self.collapse = collapse;
        self
    }

    pub fn with_notify(mut self, notify: NotifySection) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_links(mut self, links: LinksSection) -> Self {
        self.links = links;
        self
    }

    /// Run the checker and build a report. Checker failures yield an
    /// unavailable report rather than an error.
    pub fn check(&self, repo: &str) -> Report {
        match self.checker.run_check(repo) {
            Ok(output) if output.slug.is_none() && !output.is_resolved() && output.results.is_empty() => {
                tracing::warn!(repo, "Checker could not resolve repository");
                Report::unavailable()
            }
            Ok(output) => Report::from_output(output, &self.collapse),
            Err(e) => {
                tracing::warn!(repo, error = %e, "Checker unavailable");
                Report::unavailable()
            }
        }
    }

    /// Validate a repository and apply the requested membership action.
    ///
    /// Gate refusals and failed membership writes are returned on the
    /// response next to the rendered report. Only failures to read the entry
    /// store are errors.
    pub fn validate(&self, request: &ValidationRequest) -> Result<ValidationResponse> {
        let report = self.check(&request.repo);
        let decision = report.decision();
        let caps = &request.capabilities;

        let entry = match report.slug.as_deref() {
            Some(slug) => self.store.get_entry(slug)?,
            None => None,
        };
        let mut is_member = match &entry {
            Some(entry) => Some(self.store.is_member(entry)?),
            None => None,
        };

        let mut transition = None;
        let mut refusal = None;
        if request.action != MembershipAction::None {
            match &entry {
                Some(entry) => {
                    let gate =
                        MembershipGate::new(self.store, self.notifier, self.reindex, &self.notify);
                    match gate.request_transition(
                        caps,
                        entry,
                        is_member.unwrap_or(false),
                        decision,
                        request.action,
                    ) {
                        Ok(outcome) => {
                            is_member = Some(outcome.is_member);
                            transition = Some(outcome);
                        }
                        Err(e) => refusal = Some(e),
                    }
                }
                // Don't reveal registry contents to an unauthorized actor.
                None if !caps.can_manage() => refusal = Some(GateError::Unauthorized),
                None => {
                    refusal = Some(GateError::UnknownEntry {
                        slug: report.slug.clone().unwrap_or_else(|| request.repo.clone()),
                    })
                }
            }
        }

        let rendered = report.render(is_member);
        let (tools, control) = match &entry {
            Some(entry) => (
                ReviewTools::for_actor(caps, &entry.slug, entry.id, &self.links),
                MembershipControl::for_entry(
                    caps,
                    &entry.title,
                    decision,
                    is_member.unwrap_or(false),
                ),
            ),
            None => (None, None),
        };

        Ok(ValidationResponse {
            report: rendered,
            tools,
            control,
            transition,
            refusal,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckOutput, CheckResult, Severity};
    use crate::errors::CheckerError;
    use crate::gate::{AUDIT_ADDED, Capability, Transition};
    use crate::notify::Email;
    use crate::registry::{AuditLog, RegistryDb};
    use crate::report::{Banner, Decision, ReportBody};
    use std::cell::RefCell;

    struct StaticChecker(CheckOutput);

    impl Checker for StaticChecker {
        fn run_check(&self, _repo: &str) -> Result<CheckOutput, CheckerError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenChecker;

    impl Checker for BrokenChecker {
        fn run_check(&self, _repo: &str) -> Result<CheckOutput, CheckerError> {
            Err(CheckerError::NonZeroExit {
                exit_code: 1,
                stderr: "svn: E170013".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<Email>>,
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, email: &Email) -> Result<()> {
            self.sent.borrow_mut().push(email.clone());
            Ok(())
        }
    }

    fn output(results: Vec<CheckResult>) -> CheckOutput {
        CheckOutput {
            repo_url: Some("https://plugins.svn.wordpress.org/my-block/".to_string()),
            slug: Some("my-block".to_string()),
            revision: Some("1234".to_string()),
            results,
        }
    }

    fn db() -> Result<RegistryDb> {
        let db = RegistryDb::new_in_memory()?;
        db.create_entry("my-block", "My Block", Some("dev@example.com"), Some("1.0"))?;
        Ok(db)
    }

    fn request(caps: &[Capability], action: MembershipAction) -> ValidationRequest {
        ValidationRequest {
            repo: "my-block".to_string(),
            capabilities: caps.iter().cloned().collect(),
            action,
        }
    }

    #[test]
    fn test_single_error_rejects() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(vec![CheckResult::new(
            Severity::Error,
            CheckId::MissingReadme,
            "No readme.txt",
        )]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response = validator.validate(&ValidationRequest::new("my-block"))?;
        assert_eq!(response.report.decision, Decision::Reject);
        assert_eq!(response.report.banner(), Some(Banner::ProblemsFound));
        assert_eq!(response.report.sections().len(), 1);
        assert_eq!(response.report.sections()[0].items[0].message, "No readme.txt");
        assert!(response.tools.is_none());
        assert!(response.control.is_none());
        Ok(())
    }

    #[test]
    fn test_no_results_renders_notice() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(Vec::new()));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response = validator.validate(&ValidationRequest::new("my-block"))?;
        assert_eq!(response.report.decision, Decision::Accept);
        assert!(response.report.is_nothing_to_report());
        assert!(response.report.note.is_none());
        Ok(())
    }

    #[test]
    fn test_collapsed_warnings_and_notes() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(vec![
            CheckResult::new(Severity::Warning, CheckId::BlockJsonSchema, "dup A"),
            CheckResult::new(Severity::Warning, CheckId::BlockJsonSchema, "dup B"),
            CheckResult::new(Severity::Info, CheckId::Other("x".to_string()), "note"),
        ]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response = validator.validate(&ValidationRequest::new("my-block"))?;
        assert_eq!(response.report.decision, Decision::Accept);
        let warnings = response.report.section(Severity::Warning).unwrap();
        assert!(warnings.items.is_empty());
        assert_eq!(
            warnings.collapsed.as_ref().unwrap().messages,
            vec!["dup A", "dup B"]
        );
        let notes = response.report.section(Severity::Info).unwrap();
        assert_eq!(notes.items.len(), 1);
        assert_eq!(notes.items[0].message, "note");
        Ok(())
    }

    #[test]
    fn test_committer_add_applies_and_renders_new_membership() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(Vec::new()));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response =
            validator.validate(&request(&[Capability::PluginAdmin], MembershipAction::Add))?;

        let outcome = response.transition.as_ref().unwrap();
        assert_eq!(outcome.transition, Transition::Add);
        assert!(outcome.notified);
        assert!(response.refusal.is_none());

        let tools = response.tools.as_ref().unwrap();
        assert_eq!(tools.heading, "Committer Tools");
        assert!(!tools.has_link("Edit plugin"));
        assert_eq!(
            response.control.as_ref().unwrap().text(),
            "Remove My Block from Block Directory"
        );

        let entry = db.get_entry("my-block")?.unwrap();
        assert!(db.is_member(&entry)?);
        assert_eq!(db.records_for(entry.id)?[0].message, AUDIT_ADDED);
        assert_eq!(notifier.sent.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn test_member_with_clean_report_sees_already_member_banner() -> Result<()> {
        let db = db()?;
        let entry = db.get_entry("my-block")?.unwrap();
        db.set_membership(&entry, true, AUDIT_ADDED)?;
        let checker = StaticChecker(output(vec![CheckResult::new(
            Severity::Warning,
            CheckId::NoRegisterCall,
            "No register_block_type",
        )]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response = validator.validate(&ValidationRequest::new("my-block"))?;
        assert_eq!(response.report.banner(), Some(Banner::AlreadyMember));
        Ok(())
    }

    #[test]
    fn test_add_with_errors_is_refused_but_report_returned() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(vec![CheckResult::new(
            Severity::Error,
            CheckId::NoBlocksRegistered,
            "No blocks found",
        )]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response =
            validator.validate(&request(&[Capability::EditEntry], MembershipAction::Add))?;
        assert!(matches!(response.refusal, Some(GateError::BlockedByErrors)));
        assert!(response.transition.is_none());
        assert_eq!(response.report.banner(), Some(Banner::ProblemsFound));
        assert!(matches!(response.control, Some(MembershipControl::Blocked(_))));

        let entry = db.get_entry("my-block")?.unwrap();
        assert!(!db.is_member(&entry)?);
        assert!(db.records_for(entry.id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_entry_hidden_from_unauthorized_actor() -> Result<()> {
        let db = RegistryDb::new_in_memory()?;
        let checker = StaticChecker(output(Vec::new()));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response = validator.validate(&request(&[], MembershipAction::Add))?;
        assert!(matches!(response.refusal, Some(GateError::Unauthorized)));

        let response =
            validator.validate(&request(&[Capability::EditEntry], MembershipAction::Add))?;
        assert!(matches!(
            response.refusal,
            Some(GateError::UnknownEntry { ref slug }) if slug == "my-block"
        ));
        Ok(())
    }

    #[test]
    fn test_checker_failure_renders_unavailable_report() -> Result<()> {
        let db = db()?;
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&BrokenChecker, &db, &notifier, &db);

        let response = validator.validate(&ValidationRequest::new("nope"))?;
        assert!(response.report.note.is_some());
        assert!(response.report.source.is_none());
        assert!(matches!(response.report.body, ReportBody::NothingToReport { .. }));
        assert!(response.entry.is_none());
        Ok(())
    }

    #[test]
    fn test_unresolved_output_is_unavailable() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(CheckOutput::default());
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let report = validator.check("https://example.com/nothing");
        assert!(report.note.is_some());
        assert!(report.slug.is_none());
        Ok(())
    }

    #[test]
    fn test_custom_collapse_check() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(vec![
            CheckResult::new(Severity::Warning, CheckId::NonStandardBlockName, "acme/x"),
            CheckResult::new(Severity::Warning, CheckId::BlockJsonSchema, "schema"),
        ]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db)
            .with_collapse_check(CheckId::NonStandardBlockName);

        let response = validator.validate(&ValidationRequest::new("my-block"))?;
        let warnings = response.report.section(Severity::Warning).unwrap();
        assert_eq!(warnings.items.len(), 1);
        assert_eq!(warnings.items[0].check_id, CheckId::BlockJsonSchema);
        assert_eq!(warnings.collapsed.as_ref().unwrap().messages, vec!["acme/x"]);
        Ok(())
    }

    #[test]
    fn test_response_serializes_refusal_as_text() -> Result<()> {
        let db = db()?;
        let checker = StaticChecker(output(vec![CheckResult::new(
            Severity::Error,
            CheckId::MissingReadme,
            "No readme.txt",
        )]));
        let notifier = RecordingNotifier::default();
        let validator = Validator::new(&checker, &db, &notifier, &db);

        let response =
            validator.validate(&request(&[Capability::EditEntry], MembershipAction::Add))?;
        let json = serde_json::to_value(&response)?;
        assert_eq!(
            json["refusal"],
            "Plugin can't be added to the Block Directory due to errors in validation"
        );
        assert_eq!(json["report"]["decision"], "reject");
        Ok(())
    }
}
