//! Detailed help text for check results.
//!
//! Each known check maps to a resolver function in [`DETAIL_TABLE`]. A resolver
//! receives the concrete result so that one check can elaborate differently
//! depending on the instance (duplicate block names add a caution paragraph
//! only for warnings). Resolution is a pure lookup.
//!
//! Paragraph text marks inline code with backticks; presentation layers decide
//! how to show it.

use crate::check::{CheckId, CheckResult, Severity};
use serde::Serialize;

/// Tutorial linked from the "no blocks registered" help.
pub const CREATE_BLOCK_TUTORIAL_URL: &str =
    "https://developer.wordpress.org/block-editor/getting-started/create-block/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "style", rename_all = "lowercase")]
pub enum ParagraphStyle {
    Plain,
    Emphasis,
    Link { href: String },
}

/// One paragraph of elaboration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(flatten)]
    pub style: ParagraphStyle,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ParagraphStyle::Plain,
        }
    }

    pub fn emphasis(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ParagraphStyle::Emphasis,
        }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ParagraphStyle::Link { href: href.into() },
        }
    }
}

/// Elaboration attached to a single result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "paragraphs", rename_all = "lowercase")]
pub enum Details {
    /// Render only the bare message.
    None,
    Single(Paragraph),
    /// Rendered as one elaboration block, one paragraph per entry, in order.
    Multiple(Vec<Paragraph>),
}

impl Details {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The paragraphs in render order.
    pub fn paragraphs(&self) -> &[Paragraph] {
        match self {
            Self::None => &[],
            Self::Single(paragraph) => std::slice::from_ref(paragraph),
            Self::Multiple(paragraphs) => paragraphs,
        }
    }
}

type DetailFn = fn(&CheckResult) -> Details;

/// Resolver per known check. Checks absent from the table resolve to nothing.
const DETAIL_TABLE: &[(CheckId, DetailFn)] = &[
    // Self-explanatory messages.
    (CheckId::MissingReadme, no_details),
    (CheckId::MissingLicense, no_details),
    (CheckId::MissingPluginHeaders, no_details),
    // Collapsed into one block by the renderer.
    (CheckId::BlockJsonSchema, no_details),
    (CheckId::BlockTagMissing, block_tag_missing),
    (CheckId::DuplicateBlockName, duplicate_block_name),
    (CheckId::NoBlocksRegistered, no_blocks_registered),
    (CheckId::MissingBlockJson, missing_block_json),
    (CheckId::MissingScriptFile, missing_script_file),
    (CheckId::NoRegisterCall, no_register_call),
    (CheckId::InvalidBlockJson, invalid_block_json),
    (CheckId::PhpSizeExceeded, php_size_exceeded),
    (CheckId::NonStandardBlockName, non_standard_block_name),
];

/// Resolve the elaboration for `check_id` in the context of `result`.
///
/// # Examples
///
/// ```
/// use block_validator::check::{CheckId, CheckResult, Severity};
/// use block_validator::details::resolve_details;
///
/// let result = CheckResult::new(Severity::Error, CheckId::MissingReadme, "No readme.txt");
/// assert!(resolve_details(result.check_id(), &result).is_none());
///
/// let result = CheckResult::new(Severity::Warning, CheckId::DuplicateBlockName, "dup");
/// assert_eq!(resolve_details(result.check_id(), &result).paragraphs().len(), 2);
/// ```
pub fn resolve_details(check_id: &CheckId, result: &CheckResult) -> Details {
    DETAIL_TABLE
        .iter()
        .find(|(id, _)| id == check_id)
        .map(|(_, resolve)| resolve(result))
        .unwrap_or(Details::None)
}

fn no_details(_: &CheckResult) -> Details {
    Details::None
}

fn block_tag_missing(_: &CheckResult) -> Details {
    Details::Single(Paragraph::plain(
        "The readme.txt file must contain the tag \"block\" (singular) for this to be added to the block directory.",
    ))
}

fn duplicate_block_name(result: &CheckResult) -> Details {
    let mut paragraphs = vec![Paragraph::plain(
        "Block names must be unique, otherwise it can cause problems when using the block. It is recommended to use your plugin's name as the namespace.",
    )];
    if result.severity() == Severity::Warning {
        paragraphs.push(Paragraph::emphasis(
            "If this is a different version of your own plugin, you can ignore this warning.",
        ));
    }
    Details::Multiple(paragraphs)
}

fn no_blocks_registered(_: &CheckResult) -> Details {
    Details::Multiple(vec![
        Paragraph::plain(
            "In order to work in the Block Directory, a plugin must register a block. Generally one per plugin (multiple blocks may be permitted if those blocks are interdependent, such as a list block that contains list item blocks).",
        ),
        Paragraph::plain(
            "If your plugin doesn’t register a block, it probably belongs in the main Plugin Directory rather than the Block Directory.",
        ),
        Paragraph::link("Learn how to create a block.", CREATE_BLOCK_TUTORIAL_URL),
    ])
}

fn missing_block_json(_: &CheckResult) -> Details {
    Details::Single(Paragraph::plain(
        "Your plugin should contain at least one `block.json` file. This file contains metadata describing the block and its JavaScript and CSS assets. Make sure you include at least one `script` or `editorScript` item.",
    ))
}

fn missing_script_file(_: &CheckResult) -> Details {
    Details::Multiple(vec![
        Paragraph::plain(
            "The value of `script`, `style`, `editorScript`, `editorStyle` must be a valid file path. This value was detected, but there is no file at this location in your plugin.",
        ),
        Paragraph::plain(
            "Unlike regular blocks, plugins in the block directory cannot use a script handle for these values.",
        ),
    ])
}

fn no_register_call(_: &CheckResult) -> Details {
    Details::Single(Paragraph::plain(
        "At least one of your JavaScript files must explicitly call registerBlockType(). Without that call, your block will not work in the editor.",
    ))
}

fn invalid_block_json(_: &CheckResult) -> Details {
    Details::Single(Paragraph::plain(
        "This block.json file is invalid. The Block Directory needs to be able to read this file.",
    ))
}

fn php_size_exceeded(_: &CheckResult) -> Details {
    Details::Single(Paragraph::plain(
        "Block plugins should keep the PHP code to a minimum. If you need a lot of PHP code, your plugin probably belongs in the main Plugin Directory rather than the Block Directory.",
    ))
}

fn non_standard_block_name(_: &CheckResult) -> Details {
    Details::Multiple(vec![
        Paragraph::plain(
            "Block names must contain a namespace prefix, include only lowercase alphanumeric characters or dashes, and start with a letter. The namespace should be unique to your block plugin, make sure to change any defaults from block templates like \"create-block/\" or \"cgb/\".",
        ),
        Paragraph::plain("Example: `my-plugin/my-custom-block`"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details_for(severity: Severity, id: CheckId) -> Details {
        let result = CheckResult::new(severity, id, "message");
        resolve_details(result.check_id(), &result)
    }

    #[test]
    fn test_self_explanatory_checks_have_no_details() {
        for id in [
            CheckId::MissingReadme,
            CheckId::MissingLicense,
            CheckId::MissingPluginHeaders,
        ] {
            assert!(details_for(Severity::Error, id).is_none());
        }
    }

    #[test]
    fn test_collapse_target_has_no_details() {
        assert!(details_for(Severity::Warning, CheckId::BlockJsonSchema).is_none());
        assert!(details_for(Severity::Error, CheckId::BlockJsonSchema).is_none());
    }

    #[test]
    fn test_unknown_check_has_no_details() {
        assert!(details_for(Severity::Warning, CheckId::Other("mystery".into())).is_none());
    }

    #[test]
    fn test_duplicate_block_name_caution_only_for_warnings() {
        let warning = details_for(Severity::Warning, CheckId::DuplicateBlockName);
        let error = details_for(Severity::Error, CheckId::DuplicateBlockName);

        assert_eq!(warning.paragraphs().len(), 2);
        assert_eq!(warning.paragraphs()[1].style, ParagraphStyle::Emphasis);
        assert!(warning.paragraphs()[1].text.contains("you can ignore this warning"));

        assert_eq!(error.paragraphs().len(), 1);
        assert!(matches!(error, Details::Multiple(_)));
    }

    #[test]
    fn test_no_blocks_registered_ends_with_tutorial_link() {
        let details = details_for(Severity::Error, CheckId::NoBlocksRegistered);
        let paragraphs = details.paragraphs();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(
            paragraphs[2].style,
            ParagraphStyle::Link {
                href: CREATE_BLOCK_TUTORIAL_URL.to_string()
            }
        );
    }

    #[test]
    fn test_single_and_multiple_shapes() {
        assert!(matches!(
            details_for(Severity::Error, CheckId::BlockTagMissing),
            Details::Single(_)
        ));
        assert!(matches!(
            details_for(Severity::Error, CheckId::MissingScriptFile),
            Details::Multiple(ref p) if p.len() == 2
        ));
        assert!(matches!(
            details_for(Severity::Warning, CheckId::NonStandardBlockName),
            Details::Multiple(ref p) if p.len() == 2
        ));
    }

    #[test]
    fn test_every_known_check_has_a_table_entry() {
        for canonical in CheckId::known_ids() {
            let id: CheckId = canonical.parse().unwrap();
            assert!(
                DETAIL_TABLE.iter().any(|(entry, _)| entry == &id),
                "{canonical} is missing from the detail table"
            );
        }
    }

    #[test]
    fn test_details_serialization() {
        let details = Details::Single(Paragraph::plain("text"));
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["kind"], "single");
        assert_eq!(json["paragraphs"]["text"], "text");
        assert_eq!(json["paragraphs"]["style"], "plain");
    }
}
