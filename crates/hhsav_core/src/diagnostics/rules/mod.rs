mod brackets;
mod inputs;
mod keys;
mod literals;
mod members;

use thiserror::Error;

use super::scan;
use super::{Diagnostic, LineSource, Rule};
use crate::parser::ParseError;
use crate::path::Path;

pub use literals::closest_literal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RuleError {
    #[error("line {line} does not exist")]
    LineMissing { line: usize },
    #[error("span {start}..{end} does not fit line {line} ({len} chars)")]
    SpanOutOfRange {
        line: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

pub(crate) type RuleResult = Result<Option<Diagnostic>, RuleError>;

/// Rule families in claim priority. Several families can emit more than one
/// note; the first family that claims the failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleFamily {
    SymbolWrongCloser,
    MissingListClose,
    PropertyKeyQuote,
    PropertyKeyEscape,
    ScalarTail,
    CommaBeforeColon,
    CommaAfterColon,
    CommaBeforeCloser,
    CommaLineInvalidTail,
    BooleanLiteralTypo,
    WrongOpenSymbol,
    SpacingAfterColon,
    InvalidEmail,
    MissingPhoneDash,
    MissingCommaBetweenMembers,
}

pub(crate) const CATALOG: [RuleFamily; 15] = [
    RuleFamily::SymbolWrongCloser,
    RuleFamily::MissingListClose,
    RuleFamily::PropertyKeyQuote,
    RuleFamily::PropertyKeyEscape,
    RuleFamily::ScalarTail,
    RuleFamily::CommaBeforeColon,
    RuleFamily::CommaAfterColon,
    RuleFamily::CommaBeforeCloser,
    RuleFamily::CommaLineInvalidTail,
    RuleFamily::BooleanLiteralTypo,
    RuleFamily::WrongOpenSymbol,
    RuleFamily::SpacingAfterColon,
    RuleFamily::InvalidEmail,
    RuleFamily::MissingPhoneDash,
    RuleFamily::MissingCommaBetweenMembers,
];

/// Families that also run over text that already parses.
pub(crate) const LINT_CATALOG: [RuleFamily; 3] = [
    RuleFamily::SpacingAfterColon,
    RuleFamily::InvalidEmail,
    RuleFamily::MissingPhoneDash,
];

impl RuleFamily {
    pub fn claim(self, ctx: &RuleContext<'_>) -> RuleResult {
        match self {
            Self::SymbolWrongCloser => brackets::symbol_wrong_closer(ctx),
            Self::MissingListClose => brackets::missing_list_close(ctx),
            Self::PropertyKeyQuote => keys::property_key_quote(ctx),
            Self::PropertyKeyEscape => keys::property_key_escape(ctx),
            Self::ScalarTail => members::scalar_tail(ctx),
            Self::CommaBeforeColon => members::comma_before_colon(ctx),
            Self::CommaAfterColon => members::comma_after_colon(ctx),
            Self::CommaBeforeCloser => members::comma_before_closer(ctx),
            Self::CommaLineInvalidTail => members::comma_line_invalid_tail(ctx),
            Self::BooleanLiteralTypo => literals::boolean_literal_typo(ctx),
            Self::WrongOpenSymbol => brackets::wrong_open_symbol(ctx),
            Self::SpacingAfterColon => inputs::spacing_after_colon(ctx),
            Self::InvalidEmail => inputs::invalid_email(ctx),
            Self::MissingPhoneDash => inputs::missing_phone_dash(ctx),
            Self::MissingCommaBetweenMembers => members::missing_comma_between_members(ctx),
        }
    }
}

/// What a rule gets to look at: the text, the parser failure (absent when
/// linting valid text), the failing line with its characters, and the
/// selected document path.
pub(crate) struct RuleContext<'a> {
    pub lines: &'a dyn LineSource,
    pub error: Option<&'a ParseError>,
    pub line: usize,
    pub column: usize,
    pub chars: Vec<char>,
    pub selected: &'a Path,
}

impl RuleContext<'_> {
    pub fn indent(&self) -> usize {
        scan::indent_len(&self.chars)
    }

    pub fn message(&self) -> &str {
        self.error.map(|err| err.message.as_str()).unwrap_or("")
    }

    pub fn expected_closer_at_indent(&self) -> Option<char> {
        scan::expected_closer(self.lines, self.line, self.indent())
    }

    pub fn line_chars(&self, line: usize) -> Option<Vec<char>> {
        self.lines
            .line_text(line)
            .map(|text| text.chars().collect())
    }

    /// True when the next non-empty line starts with `}` or `]`.
    pub fn next_line_starts_with_closer(&self) -> bool {
        self.lines
            .next_non_empty_line_after(self.line)
            .and_then(|next| self.line_chars(next))
            .and_then(|chars| chars.into_iter().find(|c| !c.is_whitespace()))
            .is_some_and(scan::is_closer)
    }

    pub fn emit(&self, rule: Rule, span: (usize, usize), after_text: String) -> RuleResult {
        self.emit_on(rule, self.line, span, after_text)
    }

    pub fn emit_on(
        &self,
        rule: Rule,
        line: usize,
        (start_column, end_column): (usize, usize),
        after_text: String,
    ) -> RuleResult {
        let before_text = self
            .lines
            .line_text(line)
            .ok_or(RuleError::LineMissing { line })?;
        Ok(Some(Diagnostic {
            rule,
            line,
            start_column,
            end_column,
            before_text,
            after_text,
        }))
    }
}

/// Rejects diagnostics whose line or span does not exist in the text.
pub(crate) fn validate(
    lines: &dyn LineSource,
    diagnostic: Diagnostic,
) -> Result<Diagnostic, RuleError> {
    let line = diagnostic.line;
    let len = lines
        .line_text(line)
        .ok_or(RuleError::LineMissing { line })?
        .chars()
        .count();
    let (start, end) = (diagnostic.start_column, diagnostic.end_column);
    if start > end || end > len {
        return Err(RuleError::SpanOutOfRange {
            line,
            start,
            end,
            len,
        });
    }
    Ok(diagnostic)
}

pub(crate) fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

/// `chars` with `start..end` replaced by `insert`.
pub(crate) fn splice(chars: &[char], start: usize, end: usize, insert: &str) -> String {
    let mut out = collect(&chars[..start]);
    out.push_str(insert);
    out.extend(&chars[end..]);
    out
}
