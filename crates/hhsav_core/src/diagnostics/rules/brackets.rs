use super::{RuleContext, RuleError, RuleResult, collect, splice};
use crate::diagnostics::Rule;
use crate::diagnostics::scan;

/// Non-empty lines examined above a stray `}` when looking for an unclosed list.
const LIST_LOOKBACK_LINES: usize = 4;

/// A line made only of closers (and commas) whose closers disagree with the
/// open-bracket stack. Every closer in the run is rewritten to the one the
/// stack expects.
pub(super) fn symbol_wrong_closer(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    let end = scan::trimmed_len(chars);
    if indent >= end || !scan::is_closer(chars[indent]) {
        return Ok(None);
    }
    let closer_only = chars[indent..end]
        .iter()
        .all(|c| scan::is_closer(*c) || *c == ',' || c.is_whitespace());
    if !closer_only || list_left_open_above(ctx) {
        return Ok(None);
    }

    let mut stack = scan::opener_stack(ctx.lines, ctx.line, indent);
    let mut repaired = collect(&chars[..indent]);
    let mut first_bad = None;
    for (offset, &c) in chars[indent..end].iter().enumerate() {
        if !scan::is_closer(c) {
            repaired.push(c);
            continue;
        }
        match stack.pop() {
            Some(opener) => {
                let expected = scan::closer_for(opener.symbol);
                if expected != c && first_bad.is_none() {
                    first_bad = Some(indent + offset);
                }
                repaired.push(expected);
            }
            None => repaired.push(c),
        }
    }

    let Some(start) = first_bad else {
        return Ok(None);
    };
    ctx.emit(Rule::SymbolWrongCloser, (start, end), repaired)
}

/// `"key": [` left open right before the enclosing object's `}`.
pub(super) fn missing_list_close(ctx: &RuleContext<'_>) -> RuleResult {
    if ctx.chars.get(ctx.indent()) != Some(&'}') {
        return Ok(None);
    }

    let mut cursor = ctx.line;
    for _ in 0..LIST_LOOKBACK_LINES {
        let Some(previous) = ctx.lines.previous_non_empty_line_before(cursor) else {
            return Ok(None);
        };
        cursor = previous;
        let chars = ctx
            .line_chars(previous)
            .ok_or(RuleError::LineMissing { line: previous })?;
        let body = &chars[scan::indent_len(&chars)..scan::trimmed_len(&chars)];
        if body.iter().all(|c| *c == ',') {
            continue;
        }

        let Some(key) = scan::parse_key_line(&chars) else {
            return Ok(None);
        };
        let end = scan::trimmed_len(&chars);
        if chars.get(key.value_start) != Some(&'[') || key.value_start + 1 != end {
            return Ok(None);
        }
        let after = format!("{}[]", collect(&chars[..key.value_start]));
        return ctx.emit_on(
            Rule::MissingListCloseBeforeObjectEnd,
            previous,
            (key.value_start, end),
            after,
        );
    }
    Ok(None)
}

/// Opening brackets that do not fit what follows them: `(`/`<` typed in place
/// of a bracket, a list opened for members, or an object opened for elements.
pub(super) fn wrong_open_symbol(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    let key = scan::parse_key_line(chars);

    let value_start = key.map_or(indent, |key| key.value_start);
    if matches!(chars.get(value_start), Some('(' | '<'))
        && value_start + 1 == scan::trimmed_len(chars)
    {
        let replacement = if next_line_is_member(ctx) { "{" } else { "[" };
        return ctx.emit(
            Rule::WrongObjectOpenSymbol,
            (value_start, value_start + 1),
            splice(chars, value_start, value_start + 1, replacement),
        );
    }

    let Some(opener) = scan::opener_stack(ctx.lines, ctx.line, indent).pop() else {
        return Ok(None);
    };
    let opener_chars = ctx
        .line_chars(opener.line)
        .ok_or(RuleError::LineMissing { line: opener.line })?;
    let opener_ends_line =
        scan::last_significant(&opener_chars).is_some_and(|(col, _)| col == opener.column);
    if !opener_ends_line {
        return Ok(None);
    }
    let span = (opener.column, opener.column + 1);

    if key.is_some() && opener.symbol == '[' {
        return ctx.emit_on(
            Rule::WrongListOpenForObject,
            opener.line,
            span,
            splice(&opener_chars, span.0, span.1, "{"),
        );
    }
    if key.is_none() && opener.symbol == '{' && is_lone_element(chars, indent) {
        return ctx.emit_on(
            Rule::WrongObjectOpenSymbol,
            opener.line,
            span,
            splice(&opener_chars, span.0, span.1, "["),
        );
    }
    Ok(None)
}

/// `missing_list_close` repairs this shape on the line above instead.
fn list_left_open_above(ctx: &RuleContext<'_>) -> bool {
    matches!(missing_list_close(ctx), Ok(Some(_)))
}

fn next_line_is_member(ctx: &RuleContext<'_>) -> bool {
    ctx.lines
        .next_non_empty_line_after(ctx.line)
        .and_then(|line| ctx.line_chars(line))
        .is_some_and(|chars| scan::parse_key_line(&chars).is_some())
}

/// A single scalar, optionally followed by a comma.
fn is_lone_element(chars: &[char], indent: usize) -> bool {
    let Some(end) = scan::scalar_end(chars, indent) else {
        return false;
    };
    let tail = scan::skip_ws(chars, end);
    let line_end = scan::trimmed_len(chars);
    tail == line_end || (chars.get(tail) == Some(&',') && tail + 1 == line_end)
}
