mod rules;
pub(crate) mod scan;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::parser::{self, ParseError};
use crate::path::Path;

pub use rules::closest_literal;
use rules::{CATALOG, LINT_CATALOG, RuleContext};

/// Stable identifier of a diagnostic kind. The catalog evaluates the rule
/// families in priority order; the serialized form is the note string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    SymbolWrongCloser,
    MissingListCloseBeforeObjectEnd,
    MissingKeyQuoteBeforeColon,
    WrongSymbolBeforeColon,
    MissingOpenQuote,
    WrongOpenQuoteChar,
    PropertyKeyInvalidEscape,
    ScalarTailInvalid,
    CommaBeforeColon,
    CommaAfterColon,
    CommaBeforeCloser,
    CommaLineInvalidTail,
    BooleanLiteralTypo,
    WrongObjectOpenSymbol,
    WrongListOpenForObject,
    SpacingMissingSpaceAfterColon,
    InvalidEmail,
    MissingPhoneDash,
    MissingCommaBetweenMembers,
    OverlayParse,
}

impl Rule {
    pub fn note(&self) -> &'static str {
        match self {
            Self::SymbolWrongCloser => "symbol_wrong_closer",
            Self::MissingListCloseBeforeObjectEnd => "missing_list_close_before_object_end",
            Self::MissingKeyQuoteBeforeColon => "missing_key_quote_before_colon",
            Self::WrongSymbolBeforeColon => "wrong_symbol_before_colon",
            Self::MissingOpenQuote => "missing_open_quote",
            Self::WrongOpenQuoteChar => "wrong_open_quote_char",
            Self::PropertyKeyInvalidEscape => "property_key_invalid_escape",
            Self::ScalarTailInvalid => "scalar_tail_invalid",
            Self::CommaBeforeColon => "comma_before_colon",
            Self::CommaAfterColon => "comma_after_colon",
            Self::CommaBeforeCloser => "comma_before_closer",
            Self::CommaLineInvalidTail => "comma_line_invalid_tail",
            Self::BooleanLiteralTypo => "boolean_literal_typo",
            Self::WrongObjectOpenSymbol => "wrong_object_open_symbol",
            Self::WrongListOpenForObject => "wrong_list_open_for_object",
            Self::SpacingMissingSpaceAfterColon => "spacing_missing_space_after_colon",
            Self::InvalidEmail => "invalid_email",
            Self::MissingPhoneDash => "missing_phone_dash",
            Self::MissingCommaBetweenMembers => "missing_comma_between_members",
            Self::OverlayParse => "overlay_parse",
        }
    }

    /// Input-validation findings that stop an apply when validation is on.
    pub fn blocks_apply(&self) -> bool {
        matches!(self, Self::InvalidEmail | Self::MissingPhoneDash)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.note())
    }
}

/// One located finding. `line` is 1-based; the column span is 0-based,
/// half-open, and counted in characters. `after_text` is the full
/// replacement for `line`, empty when no repair is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(rename = "note")]
    pub rule: Rule,
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub before_text: String,
    pub after_text: String,
}

impl Diagnostic {
    pub fn note(&self) -> &'static str {
        self.rule.note()
    }

    pub fn has_fix(&self) -> bool {
        !self.after_text.is_empty()
    }
}

/// Line access used by the rule engine, decoupled from any buffer type.
pub trait LineSource {
    /// Raw text of 1-based line `line` without its terminator.
    fn line_text(&self, line: usize) -> Option<String>;

    fn previous_non_empty_line_before(&self, line: usize) -> Option<usize>;

    fn next_non_empty_line_after(&self, line: usize) -> Option<usize> {
        let mut current = line + 1;
        loop {
            let text = self.line_text(current)?;
            if !text.trim().is_empty() {
                return Some(current);
            }
            current += 1;
        }
    }
}

/// [`LineSource`] over a `\n`-separated string.
#[derive(Debug, Clone)]
pub struct TextLines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> TextLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }
}

impl LineSource for TextLines<'_> {
    fn line_text(&self, line: usize) -> Option<String> {
        if line == 0 {
            return None;
        }
        self.lines.get(line - 1).map(|text| (*text).to_string())
    }

    fn previous_non_empty_line_before(&self, line: usize) -> Option<usize> {
        let end = line.saturating_sub(1).min(self.lines.len());
        (1..=end)
            .rev()
            .find(|&candidate| !self.lines[candidate - 1].trim().is_empty())
    }
}

/// Result of checking editor text without committing anything.
#[derive(Debug, Clone, PartialEq)]
pub enum TextCheck {
    Parsed {
        value: Value,
        advisories: Vec<Diagnostic>,
    },
    Failed {
        error: ParseError,
        diagnostic: Diagnostic,
    },
}

impl TextCheck {
    pub fn primary(&self) -> Option<&Diagnostic> {
        match self {
            Self::Parsed { advisories, .. } => advisories.first(),
            Self::Failed { diagnostic, .. } => Some(diagnostic),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parses `text` and either explains the failure or lints the result.
    pub fn check(&self, text: &str, selected: &Path) -> TextCheck {
        match parser::parse_document(text) {
            Ok(value) => TextCheck::Parsed {
                value,
                advisories: self.lint(text, selected),
            },
            Err(error) => {
                let diagnostic = self.diagnose_failure(&TextLines::new(text), &error, selected);
                TextCheck::Failed { error, diagnostic }
            }
        }
    }

    /// Turns a parser failure into a diagnostic. Total: unclaimed failures
    /// yield the `overlay_parse` fallback.
    pub fn diagnose_failure(
        &self,
        lines: &dyn LineSource,
        error: &ParseError,
        selected: &Path,
    ) -> Diagnostic {
        let (line, column) = failing_position(lines, error);
        let chars: Vec<char> = lines.line_text(line).unwrap_or_default().chars().collect();
        let ctx = RuleContext {
            lines,
            error: Some(error),
            line,
            column,
            chars,
            selected,
        };

        for family in CATALOG {
            match family.claim(&ctx) {
                Ok(Some(diagnostic)) => match rules::validate(lines, diagnostic) {
                    Ok(diagnostic) => return diagnostic,
                    Err(err) => tracing::debug!(rule = ?family, "discarding claim: {err}"),
                },
                Ok(None) => {}
                Err(err) => tracing::debug!(rule = ?family, "rule failed: {err}"),
            }
        }

        fallback(&ctx)
    }

    /// Input-validation pass over text that already parses.
    pub fn lint(&self, text: &str, selected: &Path) -> Vec<Diagnostic> {
        let lines = TextLines::new(text);
        let mut found = Vec::new();
        for line in 1..=lines.len() {
            let Some(raw) = lines.line_text(line) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }
            let ctx = RuleContext {
                lines: &lines,
                error: None,
                line,
                column: 0,
                chars: raw.chars().collect(),
                selected,
            };
            for family in LINT_CATALOG {
                match family.claim(&ctx) {
                    Ok(Some(diagnostic)) => match rules::validate(&lines, diagnostic) {
                        Ok(diagnostic) => {
                            found.push(diagnostic);
                            break;
                        }
                        Err(err) => tracing::debug!(rule = ?family, "discarding lint: {err}"),
                    },
                    Ok(None) => {}
                    Err(err) => tracing::debug!(rule = ?family, "lint rule failed: {err}"),
                }
            }
        }
        found
    }
}

/// Replaces the diagnostic's line with its suggested text. Returns `None`
/// when the diagnostic carries no repair or its line no longer exists.
pub fn apply_fix(text: &str, diagnostic: &Diagnostic) -> Option<String> {
    if !diagnostic.has_fix() || diagnostic.line == 0 {
        return None;
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    let slot = lines.get_mut(diagnostic.line - 1)?;
    *slot = &diagnostic.after_text;
    Some(lines.join("\n"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoFixReport {
    pub text: String,
    pub applied: Vec<Diagnostic>,
    pub parses: bool,
}

/// Applies suggested repairs until the text parses, no repair is offered, or
/// the same note comes back for the same line.
pub fn auto_fix(text: &str, selected: &Path, max_passes: usize) -> AutoFixReport {
    let engine = RuleEngine::new();
    let mut current = text.to_string();
    let mut applied: Vec<Diagnostic> = Vec::new();

    for _ in 0..max_passes {
        let TextCheck::Failed { diagnostic, .. } = engine.check(&current, selected) else {
            return AutoFixReport {
                text: current,
                applied,
                parses: true,
            };
        };
        let repeated = applied
            .last()
            .is_some_and(|prev| prev.rule == diagnostic.rule && prev.line == diagnostic.line);
        if repeated {
            break;
        }
        let Some(fixed) = apply_fix(&current, &diagnostic) else {
            break;
        };
        current = fixed;
        applied.push(diagnostic);
    }

    let parses = parser::parse_document(&current).is_ok();
    AutoFixReport {
        text: current,
        applied,
        parses,
    }
}

/// Maps the parser's position onto a line that exists. Column 0 means the
/// parser had just consumed a line break, so the failure belongs to the end
/// of the previous line.
fn failing_position(lines: &dyn LineSource, error: &ParseError) -> (usize, usize) {
    let mut line = error.line.max(1);
    while line > 1 && lines.line_text(line).is_none() {
        line -= 1;
    }
    if error.column == 0 && line > 1 {
        let previous = line - 1;
        let len = lines
            .line_text(previous)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        return (previous, len);
    }
    let len = lines
        .line_text(line)
        .map(|text| text.chars().count())
        .unwrap_or(0);
    (line, error.column.saturating_sub(1).min(len))
}

fn fallback(ctx: &RuleContext<'_>) -> Diagnostic {
    let len = ctx.chars.len();
    let start = ctx.column.min(len);
    Diagnostic {
        rule: Rule::OverlayParse,
        line: ctx.line,
        start_column: start,
        end_column: (start + 1).min(len),
        before_text: ctx.chars.iter().collect(),
        after_text: String::new(),
    }
}
