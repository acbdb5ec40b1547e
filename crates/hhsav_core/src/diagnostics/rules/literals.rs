use super::{RuleContext, RuleResult, collect, splice};
use crate::diagnostics::Rule;
use crate::diagnostics::scan;

const LITERALS: [&str; 3] = ["true", "false", "null"];

/// Best literal for a mistyped bareword, tried in `true`, `false`, `null`
/// order. A literal matches when the token is the literal in another case,
/// differs from it by one substituted character or one swapped adjacent
/// pair, or is the literal missing up to two leading characters.
pub fn closest_literal(token: &str) -> Option<&'static str> {
    if token.is_empty() {
        return None;
    }
    LITERALS
        .into_iter()
        .find(|literal| literal_matches(literal, token))
}

fn literal_matches(literal: &str, token: &str) -> bool {
    if token.to_lowercase() == literal {
        return true;
    }

    let lit: Vec<char> = literal.chars().collect();
    let tok: Vec<char> = token.chars().collect();
    if lit.len() == tok.len() {
        let diffs: Vec<usize> = (0..lit.len()).filter(|&i| lit[i] != tok[i]).collect();
        match diffs.as_slice() {
            [] | [_] => return true,
            [a, b] if *b == a + 1 && lit[*a] == tok[*b] && lit[*b] == tok[*a] => return true,
            _ => {}
        }
    }

    literal.ends_with(token) && (1..=2).contains(&lit.len().saturating_sub(tok.len()))
}

/// A bareword in value position that is close to `true`, `false` or `null`.
pub(super) fn boolean_literal_typo(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let start = match scan::parse_key_line(chars) {
        Some(key) => key.value_start,
        None if ctx.expected_closer_at_indent() == Some(']') => ctx.indent(),
        None => return Ok(None),
    };
    let len = chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    if len == 0 {
        return Ok(None);
    }
    let end = start + len;
    let token = collect(&chars[start..end]);
    let Some(literal) = closest_literal(&token) else {
        return Ok(None);
    };
    if literal == token {
        return Ok(None);
    }
    ctx.emit(
        Rule::BooleanLiteralTypo,
        (start, end),
        splice(chars, start, end, literal),
    )
}
