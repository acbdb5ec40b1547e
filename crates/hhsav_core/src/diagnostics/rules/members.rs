use super::{RuleContext, RuleError, RuleResult, collect};
use crate::diagnostics::Rule;
use crate::diagnostics::scan;

/// `"key": <scalar>` followed by anything but an optional comma.
pub(super) fn scalar_tail(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let Some(key) = scan::parse_key_line(chars) else {
        return Ok(None);
    };
    let Some(end) = scan::scalar_end(chars, key.value_start) else {
        return Ok(None);
    };
    let line_end = scan::trimmed_len(chars);
    let mut start = scan::skip_ws(chars, end);
    if chars.get(start) == Some(&',') {
        start = scan::skip_ws(chars, start + 1);
    }
    if start >= line_end {
        return Ok(None);
    }
    let closers_only = chars[start..line_end]
        .iter()
        .all(|c| scan::is_closer(*c) || *c == ',' || c.is_whitespace());
    if closers_only {
        return Ok(None);
    }

    let mut after = collect(&chars[..end]);
    let more_members = ctx.lines.next_non_empty_line_after(ctx.line).is_some();
    if more_members && !ctx.next_line_starts_with_closer() {
        after.push(',');
    }
    ctx.emit(Rule::ScalarTailInvalid, (start, chars.len()), after)
}

/// `"key" ,, : value`
pub(super) fn comma_before_colon(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    let Some(key_end) = scan::scan_string(chars, indent) else {
        return Ok(None);
    };
    let first = scan::skip_ws(chars, key_end);
    if chars.get(first) != Some(&',') {
        return Ok(None);
    }

    let mut cursor = first;
    let mut run_end = first;
    while let Some(&c) = chars.get(cursor) {
        if c == ',' {
            cursor += 1;
            run_end = cursor;
        } else if c.is_whitespace() {
            cursor += 1;
        } else {
            break;
        }
    }
    if chars.get(cursor) != Some(&':') {
        return Ok(None);
    }
    let rest = scan::skip_ws(chars, cursor + 1);
    let after = format!("{}: {}", collect(&chars[..key_end]), collect(&chars[rest..]));
    ctx.emit(Rule::CommaBeforeColon, (first, run_end), after)
}

/// `"key": , value`
pub(super) fn comma_after_colon(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let Some(key) = scan::parse_key_line(chars) else {
        return Ok(None);
    };
    let first = key.value_start;
    if chars.get(first) != Some(&',') {
        return Ok(None);
    }
    let Some(value_start) = (first..chars.len()).find(|&i| scan::is_value_start(chars[i])) else {
        return Ok(None);
    };
    let after = format!(
        "{} {}",
        collect(&chars[..=key.colon]),
        collect(&chars[value_start..])
    );
    ctx.emit(Rule::CommaAfterColon, (first, value_start), after)
}

/// `, }` where `},` was meant.
pub(super) fn comma_before_closer(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    if chars.get(indent) != Some(&',') {
        return Ok(None);
    }
    let mut body: Vec<char> = chars[indent + 1..scan::trimmed_len(chars)]
        .iter()
        .copied()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.last() == Some(&',') {
        body.pop();
    }
    if body.is_empty() || !body.iter().all(|c| scan::is_closer(*c)) {
        return Ok(None);
    }
    let after = format!("{}{},", collect(&chars[..indent]), collect(&body));
    ctx.emit(Rule::CommaBeforeCloser, (indent, chars.len()), after)
}

/// A comma-led line carrying something other than closers.
pub(super) fn comma_line_invalid_tail(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    if chars.get(indent) != Some(&',') {
        return Ok(None);
    }
    let line_end = scan::trimmed_len(chars);
    let body_start = scan::skip_ws(chars, indent + 1);
    if body_start >= line_end {
        return Ok(None);
    }
    let pure_closers = chars[body_start..line_end]
        .iter()
        .all(|c| scan::is_closer(*c) || *c == ',' || c.is_whitespace());
    if pure_closers {
        return Ok(None);
    }
    let Some(closer) = scan::expected_closer(ctx.lines, ctx.line, indent) else {
        return Ok(None);
    };
    let after = format!("{}{closer},", collect(&chars[..indent]));
    ctx.emit(Rule::CommaLineInvalidTail, (indent, chars.len()), after)
}

/// The parser wanted a comma at the start of this line and the previous line
/// ends in a complete value: the separator was left off that line.
pub(super) fn missing_comma_between_members(ctx: &RuleContext<'_>) -> RuleResult {
    if !ctx.message().contains("expected `,`") {
        return Ok(None);
    }
    let indent = ctx.indent();
    if ctx.column != indent || ctx.chars.get(indent).is_none_or(|c| scan::is_closer(*c)) {
        return Ok(None);
    }
    let Some(previous) = ctx.lines.previous_non_empty_line_before(ctx.line) else {
        return Ok(None);
    };
    let chars = ctx
        .line_chars(previous)
        .ok_or(RuleError::LineMissing { line: previous })?;
    let Some((last, symbol)) = scan::last_significant(&chars) else {
        return Ok(None);
    };
    if matches!(symbol, ',' | '{' | '[' | ':') {
        return Ok(None);
    }
    let after = format!("{},", collect(&chars[..=last]));
    ctx.emit_on(
        Rule::MissingCommaBetweenMembers,
        previous,
        (last, last + 1),
        after,
    )
}
