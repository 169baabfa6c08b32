//! Report construction and rendering.
//!
//! A [`Report`] is built fresh from one checker run and never mutated. [`render`]
//! turns its classification into a [`RenderedReport`]: a banner, one section per
//! non-empty severity (errors, then warnings, then notes), and the collapsed
//! block appended to the warnings section. A run that reported nothing at all
//! renders a single generic notice instead.
//!
//! The rendered report is plain data. It can be serialized as JSON, displayed
//! on a terminal through [`std::fmt::Display`], or turned into HTML with
//! [`RenderedReport::to_html`].

use crate::check::{CheckId, CheckOutput, CheckResult, Severity};
use crate::classify::{Classification, classify};
use crate::details::{Details, Paragraph, ParagraphStyle, resolve_details};
use console::style;
use serde::Serialize;
use std::fmt;

/// Summary heading of the collapsed block.
pub const COLLAPSED_SUMMARY: &str = "Issues found in block.json file.";
/// Notice shown when the checker reported nothing at all.
pub const NOTHING_TO_REPORT: &str = "Congratulations! No errors found.";
/// Note shown when the checker could not resolve the repository.
pub const CHECKER_UNAVAILABLE_NOTE: &str =
    "The repository could not be resolved, so no results are available for it.";

/// Overall pass/fail outcome of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn accepts(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "ACCEPT"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// A report derived from one checker run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub repo_url: Option<String>,
    pub slug: Option<String>,
    pub revision: Option<String>,
    pub classification: Classification,
    /// Explanation shown when the checker could not produce results.
    pub note: Option<String>,
}

impl Report {
    /// Build a report from checker output, collapsing non-error results of `collapse`.
    pub fn from_output(output: CheckOutput, collapse: &CheckId) -> Self {
        let CheckOutput {
            repo_url,
            slug,
            revision,
            results,
        } = output;
        Self {
            repo_url,
            slug,
            revision,
            classification: classify(results, collapse),
            note: None,
        }
    }

    /// A report for a repository the checker could not reach or resolve.
    pub fn unavailable() -> Self {
        Self {
            repo_url: None,
            slug: None,
            revision: None,
            classification: Classification::default(),
            note: Some(CHECKER_UNAVAILABLE_NOTE.to_string()),
        }
    }

    pub fn decision(&self) -> Decision {
        if self.classification.accepts() {
            Decision::Accept
        } else {
            Decision::Reject
        }
    }

    /// Render this report. `is_member` is the current registry membership of
    /// the resolved entry, if one was found.
    pub fn render(&self, is_member: Option<bool>) -> RenderedReport {
        let mut rendered = render(&self.classification, is_member);
        rendered.source = match (&self.repo_url, &self.revision) {
            (Some(repo_url), Some(revision)) => Some(ResolvedSource {
                repo_url: repo_url.clone(),
                revision: revision.clone(),
            }),
            _ => None,
        };
        rendered.note = self.note.clone();
        rendered
    }
}

/// Top-level banner of a report with at least one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Banner {
    /// No errors, and the entry is already in the registry.
    AlreadyMember,
    /// No errors, and the entry could be added.
    Eligible,
    /// At least one error.
    ProblemsFound,
}

impl Banner {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::ProblemsFound)
    }

    pub fn heading(&self) -> &'static str {
        if self.is_success() {
            "Success"
        } else {
            "Problems were encountered"
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Self::AlreadyMember => {
                "No problems were found. This plugin is already in the Block Directory."
            }
            Self::Eligible => {
                "No problems were found. Your plugin has passed the first step towards being included in the Block Directory."
            }
            Self::ProblemsFound => {
                "Some problems were found. They need to be addressed before your plugin will work in the Block Directory."
            }
        }
    }
}

/// A single result with its resolved elaboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedItem {
    pub check_id: CheckId,
    pub message: String,
    pub details: Details,
}

/// Collapsed results of one check, shown as one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollapsedBlock {
    pub check_id: CheckId,
    pub summary: String,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub severity: Severity,
    pub label: &'static str,
    pub items: Vec<RenderedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<CollapsedBlock>,
}

fn section_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "Fatal Errors:",
        Severity::Warning => "Warnings:",
        Severity::Info => "Notes:",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody {
    Findings {
        banner: Banner,
        sections: Vec<Section>,
    },
    /// The checker reported nothing at all.
    NothingToReport { notice: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSource {
    pub repo_url: String,
    pub revision: String,
}

/// Presentation-independent rendering of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolvedSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub decision: Decision,
    pub body: ReportBody,
}

/// Render a classification.
///
/// # Examples
///
/// ```
/// use block_validator::check::{CheckId, CheckResult, Severity};
/// use block_validator::classify::classify;
/// use block_validator::report::{render, Banner, Decision, ReportBody};
///
/// let classified = classify(
///     vec![CheckResult::new(Severity::Error, CheckId::MissingReadme, "No readme.txt")],
///     &CheckId::BlockJsonSchema,
/// );
/// let rendered = render(&classified, Some(false));
/// assert_eq!(rendered.decision, Decision::Reject);
/// assert!(matches!(
///     rendered.body,
///     ReportBody::Findings { banner: Banner::ProblemsFound, .. }
/// ));
/// ```
pub fn render(classification: &Classification, is_member: Option<bool>) -> RenderedReport {
    let decision = if classification.accepts() {
        Decision::Accept
    } else {
        Decision::Reject
    };

    let sections: Vec<Section> = Severity::ALL
        .into_iter()
        .filter_map(|severity| render_section(classification, severity))
        .collect();

    let body = if sections.is_empty() {
        ReportBody::NothingToReport {
            notice: NOTHING_TO_REPORT.to_string(),
        }
    } else {
        let banner = match (decision, is_member.unwrap_or(false)) {
            (Decision::Reject, _) => Banner::ProblemsFound,
            (Decision::Accept, true) => Banner::AlreadyMember,
            (Decision::Accept, false) => Banner::Eligible,
        };
        ReportBody::Findings { banner, sections }
    };

    RenderedReport {
        source: None,
        note: None,
        decision,
        body,
    }
}

fn render_section(classification: &Classification, severity: Severity) -> Option<Section> {
    let items: Vec<RenderedItem> = classification
        .buckets
        .get(severity)
        .iter()
        .map(|result| render_item(result, severity))
        .collect();

    let collapsed = match severity {
        Severity::Warning => collapse(&classification.collapsed),
        _ => None,
    };

    if items.is_empty() && collapsed.is_none() {
        return None;
    }

    Some(Section {
        severity,
        label: section_label(severity),
        items,
        collapsed,
    })
}

fn render_item(result: &CheckResult, severity: Severity) -> RenderedItem {
    // Notes are self-contained and never elaborated.
    let details = match severity {
        Severity::Info => Details::None,
        _ => resolve_details(result.check_id(), result),
    };
    RenderedItem {
        check_id: result.check_id().clone(),
        message: result.message().to_string(),
        details,
    }
}

fn collapse(collapsed: &[CheckResult]) -> Option<CollapsedBlock> {
    let first = collapsed.first()?;
    Some(CollapsedBlock {
        check_id: first.check_id().clone(),
        summary: COLLAPSED_SUMMARY.to_string(),
        messages: collapsed.iter().map(|r| r.message().to_string()).collect(),
    })
}

impl RenderedReport {
    /// Check if the body is the degenerate "nothing to report" notice.
    pub fn is_nothing_to_report(&self) -> bool {
        matches!(self.body, ReportBody::NothingToReport { .. })
    }

    pub fn sections(&self) -> &[Section] {
        match &self.body {
            ReportBody::Findings { sections, .. } => sections,
            ReportBody::NothingToReport { .. } => &[],
        }
    }

    pub fn section(&self, severity: Severity) -> Option<&Section> {
        self.sections().iter().find(|s| s.severity == severity)
    }

    pub fn banner(&self) -> Option<Banner> {
        match &self.body {
            ReportBody::Findings { banner, .. } => Some(*banner),
            ReportBody::NothingToReport { .. } => None,
        }
    }

    /// HTML markup for embedding in the validator page.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<h2>Results</h2>\n");

        if let Some(source) = &self.source {
            out.push_str(&format!(
                "<p>Results for <code>{}</code> revision {}</p>\n",
                escape_html(&source.repo_url),
                escape_html(&source.revision)
            ));
        }

        if let Some(note) = &self.note {
            out.push_str(&format!(
                "<div class='notice notice-warning notice-alt'>\n<p>{}</p></div>\n",
                escape_html(note)
            ));
        }

        match &self.body {
            ReportBody::NothingToReport { notice } => {
                out.push_str(&format!(
                    "<div class=\"notice notice-success notice-alt\"><p>{}</p></div>\n",
                    escape_html(notice)
                ));
            }
            ReportBody::Findings { banner, sections } => {
                let kind = if banner.is_success() { "success" } else { "error" };
                out.push_str(&format!("<h3>{}</h3>\n", banner.heading()));
                out.push_str(&format!(
                    "<div class='notice notice-{kind} notice-alt'>\n<p>{}</p></div>\n",
                    banner.text()
                ));
                for section in sections {
                    section_html(&mut out, section);
                }
            }
        }
        out
    }
}

fn section_html(out: &mut String, section: &Section) {
    out.push_str(&format!("<h3>{}</h3>\n", section.label));
    out.push_str(&format!(
        "<div class='notice notice-{} notice-alt'>\n",
        section.severity
    ));
    for item in &section.items {
        let message = escape_html(&item.message);
        if item.details.is_none() {
            out.push_str(&format!("<p>{message}</p>"));
        } else {
            out.push_str(&format!(
                "<details class='{}'><summary>{message}</summary>{}</details>",
                item.check_id,
                paragraphs_html(item.details.paragraphs())
            ));
        }
    }
    if let Some(block) = &section.collapsed {
        let messages: String = block
            .messages
            .iter()
            .map(|m| format!("<p>{}</p>", escape_html(m)))
            .collect();
        out.push_str(&format!(
            "<details class=\"{}\"><summary>{}</summary>{messages}</details>",
            block.check_id,
            escape_html(&block.summary)
        ));
    }
    out.push_str("</div>\n");
}

fn paragraphs_html(paragraphs: &[Paragraph]) -> String {
    paragraphs
        .iter()
        .map(|p| {
            let text = inline_code_html(&p.text);
            match &p.style {
                ParagraphStyle::Plain => format!("<p>{text}</p>"),
                ParagraphStyle::Emphasis => format!("<p><em>{text}</em></p>"),
                ParagraphStyle::Link { href } => {
                    format!("<p><a href=\"{}\">{text}</a></p>", escape_html(href))
                }
            }
        })
        .collect()
}

/// Escape text, then turn backtick spans into `<code>` elements.
fn inline_code_html(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::with_capacity(escaped.len());
    let mut open = false;
    for part in escaped.split('`') {
        out.push_str(part);
        out.push_str(if open { "</code>" } else { "<code>" });
        open = !open;
    }
    // Drop the tag appended after the final part.
    let trailing = if open { "<code>" } else { "</code>" };
    out.truncate(out.len() - trailing.len());
    if !open {
        // Unbalanced backtick: close the dangling code element.
        out.push_str("</code>");
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn text_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .unwrap_or(80)
        .clamp(40, 100)
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, text: &str, indent: &str) -> fmt::Result {
    let options = textwrap::Options::new(text_width())
        .initial_indent(indent)
        .subsequent_indent(indent);
    for line in textwrap::wrap(text, options) {
        writeln!(f, "{line}")?;
    }
    Ok(())
}

impl fmt::Display for RenderedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", style("Results").bold())?;

        if let Some(source) = &self.source {
            writeln!(
                f,
                "Results for {} revision {}",
                style(&source.repo_url).cyan(),
                source.revision
            )?;
        }
        if let Some(note) = &self.note {
            write_wrapped(f, &format!("{} {note}", style("Note:").yellow()), "")?;
        }
        writeln!(f)?;

        match &self.body {
            ReportBody::NothingToReport { notice } => {
                writeln!(f, "{} {notice}", style("✓").green())?;
            }
            ReportBody::Findings { banner, sections } => {
                let heading = if banner.is_success() {
                    style(banner.heading()).green().bold()
                } else {
                    style(banner.heading()).red().bold()
                };
                writeln!(f, "{heading}")?;
                write_wrapped(f, banner.text(), "  ")?;

                for section in sections {
                    writeln!(f)?;
                    let label = match section.severity {
                        Severity::Error => style(section.label).red().bold(),
                        Severity::Warning => style(section.label).yellow().bold(),
                        Severity::Info => style(section.label).blue().bold(),
                    };
                    writeln!(f, "{label}")?;
                    for item in &section.items {
                        write_wrapped(f, &format!("- {}", item.message), "  ")?;
                        for paragraph in item.details.paragraphs() {
                            let text = match &paragraph.style {
                                ParagraphStyle::Link { href } => {
                                    format!("{} <{href}>", paragraph.text)
                                }
                                _ => paragraph.text.clone(),
                            };
                            write_wrapped(f, &text, "      ")?;
                        }
                    }
                    if let Some(block) = &section.collapsed {
                        write_wrapped(f, &format!("- {}", block.summary), "  ")?;
                        for message in &block.messages {
                            write_wrapped(f, message, "      ")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
