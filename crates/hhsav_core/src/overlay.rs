use serde::Serialize;

use crate::diagnostics::{Diagnostic, Rule};
use crate::guard::KeyChange;
use crate::label_format::format_path_label;
use crate::lock_policy::LockViolation;
use crate::path::Path;

pub const INVALID_ENTRY_TITLE: &str = "Invalid Entry";
pub const EDIT_BLOCKED_TITLE: &str = "Edit Blocked";
pub const STRUCTURE_CHANGED_MESSAGE: &str =
    "Object structure changed. Renaming/removing object keys is blocked for safety.";

const AUTO_FIX_LABEL: &str = "Auto-Fix";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayAction {
    /// Replace `line` (1-based) of the editor text with `replacement`.
    AutoFix {
        label: String,
        line: usize,
        replacement: String,
    },
}

/// Rejection summary shown next to the editor highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlay {
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub actions: Vec<OverlayAction>,
}

impl Overlay {
    fn blocked(message: String) -> Self {
        Self {
            title: EDIT_BLOCKED_TITLE.to_string(),
            message,
            before: None,
            after: None,
            actions: Vec::new(),
        }
    }

    pub fn for_diagnostic(diagnostic: &Diagnostic) -> Self {
        let message = format!(
            "{}\nLine {}, column {}.",
            explain(diagnostic.rule),
            diagnostic.line,
            diagnostic.start_column + 1
        );
        let mut actions = Vec::new();
        let mut after = None;
        if diagnostic.has_fix() {
            after = Some(diagnostic.after_text.trim().to_string());
            actions.push(OverlayAction::AutoFix {
                label: AUTO_FIX_LABEL.to_string(),
                line: diagnostic.line,
                replacement: diagnostic.after_text.clone(),
            });
        }
        Self {
            title: INVALID_ENTRY_TITLE.to_string(),
            message,
            before: Some(diagnostic.before_text.trim().to_string()),
            after,
            actions,
        }
    }

    pub fn for_key_change(change: &KeyChange) -> Self {
        let mut message = STRUCTURE_CHANGED_MESSAGE.to_string();
        if change.type_changed {
            message.push_str(&format!(
                "\n{} is no longer an object.",
                format_path_label(&change.path)
            ));
        }
        if !change.missing.is_empty() {
            message.push_str(&format!("\nMissing keys: {}", change.missing.join(", ")));
        }
        if !change.added.is_empty() {
            message.push_str(&format!("\nAdded keys: {}", change.added.join(", ")));
        }
        Self::blocked(message)
    }

    pub fn for_lock_blocked(violation: &LockViolation<'_>) -> Self {
        Self::blocked(format!(
            "{}\nField: {}",
            violation.detail(),
            format_path_label(&violation.path)
        ))
    }

    pub fn for_stale_path(path: &Path) -> Self {
        Self::blocked(format!(
            "The selected entry ({}) no longer exists. Refresh the selection and try again.",
            format_path_label(path)
        ))
    }

    pub fn for_round_trip_failure(detail: &str) -> Self {
        Self::blocked(format!(
            "The edited document could not be re-read after saving, so the change was undone.\n{detail}"
        ))
    }
}

/// User-facing explanation for each diagnostic note.
pub fn explain(rule: Rule) -> &'static str {
    match rule {
        Rule::SymbolWrongCloser => "This closing bracket does not match the one that was opened.",
        Rule::MissingListCloseBeforeObjectEnd => {
            "A list was opened but never closed before the object ended."
        }
        Rule::MissingKeyQuoteBeforeColon => "Property names must be wrapped in double quotes.",
        Rule::WrongSymbolBeforeColon => "Use a colon (:) between a property name and its value.",
        Rule::MissingOpenQuote => "This property name is missing its opening quote.",
        Rule::WrongOpenQuoteChar => "Property names must use straight double quotes (\").",
        Rule::PropertyKeyInvalidEscape => "A backslash is escaping the quote that ends this name.",
        Rule::ScalarTailInvalid => "Unexpected text follows this value.",
        Rule::CommaBeforeColon => "Remove the comma between the property name and the colon.",
        Rule::CommaAfterColon => "Remove the comma between the colon and the value.",
        Rule::CommaBeforeCloser => "The comma belongs after the closing bracket.",
        Rule::CommaLineInvalidTail => "This line should close the open bracket.",
        Rule::BooleanLiteralTypo => "Use true, false or null in lowercase.",
        Rule::WrongObjectOpenSymbol => "This bracket does not match the entries inside it.",
        Rule::WrongListOpenForObject => "Named entries need braces {} instead of a list [].",
        Rule::SpacingMissingSpaceAfterColon => "Add a space after the colon.",
        Rule::InvalidEmail => "This does not look like a valid email address.",
        Rule::MissingPhoneDash => "Phone numbers are written with dashes.",
        Rule::MissingCommaBetweenMembers => "A comma is missing between these entries.",
        Rule::OverlayParse => "The text is not valid JSON.",
    }
}
