use super::{RuleContext, RuleResult, collect, splice};
use crate::diagnostics::Rule;
use crate::diagnostics::scan;

/// Symbols typed where the key/value colon belongs.
const WRONG_COLON_SYMBOLS: [char; 7] = ['=', ';', '.', '>', '-', '|', '~'];

/// Quote characters that look like `"` but are not JSON quotes.
const LOOKALIKE_QUOTES: [char; 10] = ['\'', '‘', '’', '“', '”', '„', '«', '»', '`', '´'];

/// Member keys inside an object that are unquoted, half-quoted, quoted with
/// the wrong character, or separated from their value by the wrong symbol.
pub(super) fn property_key_quote(ctx: &RuleContext<'_>) -> RuleResult {
    if ctx.expected_closer_at_indent() != Some('}') {
        return Ok(None);
    }
    let indent = ctx.indent();
    let Some(&first) = ctx.chars.get(indent) else {
        return Ok(None);
    };
    if first == '"' {
        return quoted_key(ctx, indent);
    }
    if LOOKALIKE_QUOTES.contains(&first) {
        return lookalike_key(ctx, indent);
    }
    bareword_key(ctx, indent)
}

/// `"name\": 1` where the closing quote was escaped by accident.
pub(super) fn property_key_escape(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let indent = ctx.indent();
    if chars.get(indent) != Some(&'"') {
        return Ok(None);
    }

    let mut cursor = indent + 1;
    while cursor + 1 < chars.len() {
        match chars[cursor] {
            '\\' if chars[cursor + 1] == '"' => {
                if chars.get(scan::skip_ws(chars, cursor + 2)) == Some(&':') {
                    return ctx.emit(
                        Rule::PropertyKeyInvalidEscape,
                        (cursor, cursor + 1),
                        splice(chars, cursor, cursor + 1, ""),
                    );
                }
                cursor += 2;
            }
            '\\' => cursor += 2,
            '"' => return Ok(None),
            _ => cursor += 1,
        }
    }
    Ok(None)
}

fn quoted_key(ctx: &RuleContext<'_>, indent: usize) -> RuleResult {
    let chars = &ctx.chars;
    let Some(end) = scan::scan_string(chars, indent) else {
        return unclosed_key(ctx, indent);
    };
    let next = scan::skip_ws(chars, end);
    let next_char = chars.get(next).copied();
    if next_char == Some(':') {
        return Ok(None);
    }

    // The string ran past the colon: its closing quote is missing.
    let content = &chars[indent + 1..end - 1];
    if let Some(colon) = content.iter().position(|c| *c == ':') {
        let key = &content[..scan::trimmed_len(&content[..colon])];
        if key.ends_with(&['\\', '"']) || key.is_empty() {
            return Ok(None);
        }
        let rest = scan::skip_ws(chars, indent + 1 + colon + 1);
        return ctx.emit(
            Rule::MissingKeyQuoteBeforeColon,
            (indent, indent + 1 + colon),
            requote(chars, indent, &collect(key), rest),
        );
    }

    if next_char.is_some_and(|c| WRONG_COLON_SYMBOLS.contains(&c)) {
        let mut run_end = next;
        while chars
            .get(run_end)
            .is_some_and(|c| WRONG_COLON_SYMBOLS.contains(c))
        {
            run_end += 1;
        }
        let mut rest = scan::skip_ws(chars, run_end);
        if chars.get(rest) == Some(&':') {
            rest = scan::skip_ws(chars, rest + 1);
        }
        let after = format!("{}: {}", collect(&chars[..end]), collect(&chars[rest..]));
        return ctx.emit(Rule::WrongSymbolBeforeColon, (next, run_end), after);
    }
    Ok(None)
}

fn unclosed_key(ctx: &RuleContext<'_>, indent: usize) -> RuleResult {
    let chars = &ctx.chars;
    let Some(colon) = find_colon(chars, indent + 1) else {
        return Ok(None);
    };
    let body = &chars[indent + 1..colon];
    let key = &body[..scan::trimmed_len(body)];
    if key.is_empty() || key.ends_with(&['\\', '"']) {
        return Ok(None);
    }
    let rest = scan::skip_ws(chars, colon + 1);
    ctx.emit(
        Rule::MissingKeyQuoteBeforeColon,
        (indent, colon),
        requote(chars, indent, &collect(key), rest),
    )
}

fn lookalike_key(ctx: &RuleContext<'_>, indent: usize) -> RuleResult {
    let chars = &ctx.chars;
    let Some(colon) = find_colon(chars, indent + 1) else {
        return Ok(None);
    };
    let body = &chars[indent + 1..colon];
    let mut key = &body[..scan::trimmed_len(body)];
    if let Some((last, rest)) = key.split_last() {
        if *last == '"' || LOOKALIKE_QUOTES.contains(last) {
            key = rest;
        }
    }
    if key.is_empty() {
        return Ok(None);
    }
    let rest = scan::skip_ws(chars, colon + 1);
    ctx.emit(
        Rule::WrongOpenQuoteChar,
        (indent, colon),
        requote(chars, indent, &collect(key), rest),
    )
}

fn bareword_key(ctx: &RuleContext<'_>, indent: usize) -> RuleResult {
    let chars = &ctx.chars;
    let mut cursor = indent;
    while chars
        .get(cursor)
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '.'))
    {
        cursor += 1;
    }
    if cursor == indent {
        return Ok(None);
    }
    let word_end = cursor;
    let rule = if chars.get(cursor) == Some(&'"') {
        cursor += 1;
        Rule::MissingOpenQuote
    } else {
        Rule::MissingKeyQuoteBeforeColon
    };
    let colon = scan::skip_ws(chars, cursor);
    if chars.get(colon) != Some(&':') {
        return Ok(None);
    }
    let rest = scan::skip_ws(chars, colon + 1);
    ctx.emit(
        rule,
        (indent, cursor),
        requote(chars, indent, &collect(&chars[indent..word_end]), rest),
    )
}

fn find_colon(chars: &[char], from: usize) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|c| *c == ':')
        .map(|offset| from + offset)
}

/// `<indent>"key": <rest>`
fn requote(chars: &[char], indent: usize, key: &str, rest: usize) -> String {
    format!(
        "{}\"{key}\": {}",
        collect(&chars[..indent]),
        collect(&chars[rest..])
    )
}
