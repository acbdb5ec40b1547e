use std::sync::OnceLock;

use regex::Regex;

use super::{RuleContext, RuleResult, collect, splice};
use crate::diagnostics::Rule;
use crate::diagnostics::scan;

const EMAIL_KEYS: [&str; 3] = ["email", "from", "to"];
const KNOWN_TLDS: [&str; 7] = ["com", "net", "org", "edu", "gov", "io", "co"];

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// `"key":value` with nothing between the colon and the value.
pub(super) fn spacing_after_colon(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let Some(key) = scan::parse_key_line(chars) else {
        return Ok(None);
    };
    if key.colon != key.key_end || key.value_start != key.colon + 1 {
        return Ok(None);
    }
    if chars.get(key.value_start).is_none() {
        return Ok(None);
    }
    ctx.emit(
        Rule::SpacingMissingSpaceAfterColon,
        (key.colon, key.colon + 1),
        splice(chars, key.value_start, key.value_start, " "),
    )
}

pub(super) fn invalid_email(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let Some((key, start)) = field_value(ctx) else {
        return Ok(None);
    };
    if !EMAIL_KEYS.contains(&key.to_lowercase().as_str()) || chars.get(start) != Some(&'"') {
        return Ok(None);
    }
    let Some(end) = scan::scan_string(chars, start) else {
        return Ok(None);
    };
    let content = collect(&chars[start + 1..end - 1]);
    if content.is_empty() || content.contains('\\') || email_pattern().is_match(&content) {
        return Ok(None);
    }
    let Some(fixed) = email_candidates(&content)
        .into_iter()
        .find(|candidate| email_pattern().is_match(candidate))
    else {
        return Ok(None);
    };
    ctx.emit(
        Rule::InvalidEmail,
        (start + 1, end - 1),
        splice(chars, start + 1, end - 1, &fixed),
    )
}

pub(super) fn missing_phone_dash(ctx: &RuleContext<'_>) -> RuleResult {
    let chars = &ctx.chars;
    let Some((key, start)) = field_value(ctx) else {
        return Ok(None);
    };
    if !key.to_lowercase().contains("phone") {
        return Ok(None);
    }
    let Some(value_end) = scan::scalar_end(chars, start) else {
        return Ok(None);
    };
    let (digits_start, digits_end) = if chars[start] == '"' {
        (start + 1, value_end - 1)
    } else {
        (start, value_end)
    };
    let digits = collect(&chars[digits_start..digits_end]);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    let Some(dashed) = dash_phone(&digits) else {
        return Ok(None);
    };
    ctx.emit(
        Rule::MissingPhoneDash,
        (digits_start, digits_end),
        splice(chars, start, value_end, &format!("\"{dashed}\"")),
    )
}

/// Key and value start for the line: a `"key": value` member, or a lone
/// scalar standing for the value of the selected field.
fn field_value(ctx: &RuleContext<'_>) -> Option<(String, usize)> {
    let chars = &ctx.chars;
    if let Some(key) = scan::parse_key_line(chars) {
        return Some((key.key_string(chars), key.value_start));
    }
    let indent = ctx.indent();
    let end = scan::scalar_end(chars, indent)?;
    if end != scan::trimmed_len(chars) {
        return None;
    }
    ctx.selected
        .last_key()
        .map(|key| (key.to_string(), indent))
}

/// One-edit repairs for a near-miss address; the caller keeps the first
/// that validates.
fn email_candidates(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut out = Vec::new();

    if !content.contains('@') {
        for (i, c) in chars.iter().enumerate() {
            if !c.is_alphanumeric() && *c != '.' {
                out.push(splice(&chars, i, i + 1, "@"));
            }
        }
    }
    if content.contains("@@") {
        out.push(content.replacen("@@", "@", 1));
    }
    for (i, c) in chars.iter().enumerate() {
        match c {
            ',' => out.push(splice(&chars, i, i + 1, ".")),
            ' ' => out.push(splice(&chars, i, i + 1, "")),
            _ => {}
        }
    }
    if let Some((local, domain)) = content.split_once('@') {
        if !domain.contains('.') {
            if let Some(tld) = KNOWN_TLDS
                .iter()
                .find(|tld| domain.len() > tld.len() && domain.ends_with(*tld))
            {
                let host = &domain[..domain.len() - tld.len()];
                out.push(format!("{local}@{host}.{tld}"));
            }
        }
    }
    if let Some(stripped) = content.strip_suffix('.') {
        out.push(stripped.to_string());
    }
    out
}

fn dash_phone(digits: &str) -> Option<String> {
    let groups: &[usize] = match digits.len() {
        7 => &[3, 4],
        10 => &[3, 3, 4],
        11 => &[1, 3, 3, 4],
        _ => return None,
    };
    let mut parts = Vec::with_capacity(groups.len());
    let mut cursor = 0;
    for len in groups {
        parts.push(&digits[cursor..cursor + len]);
        cursor += len;
    }
    Some(parts.join("-"))
}

#[cfg(test)]
mod tests {
    use super::{dash_phone, email_candidates, email_pattern};

    fn first_valid(content: &str) -> Option<String> {
        email_candidates(content)
            .into_iter()
            .find(|candidate| email_pattern().is_match(candidate))
    }

    #[test]
    fn email_repairs_cover_single_edits() {
        assert_eq!(first_valid("bob#example.com").as_deref(), Some("bob@example.com"));
        assert_eq!(first_valid("bob@@example.com").as_deref(), Some("bob@example.com"));
        assert_eq!(first_valid("bob@example,com").as_deref(), Some("bob@example.com"));
        assert_eq!(first_valid("bob @example.com").as_deref(), Some("bob@example.com"));
        assert_eq!(first_valid("alice@examplecom").as_deref(), Some("alice@example.com"));
        assert_eq!(first_valid("bob@example.com.").as_deref(), Some("bob@example.com"));
        assert_eq!(first_valid("not an address at all"), None);
    }

    #[test]
    fn phone_groups_follow_digit_count() {
        assert_eq!(dash_phone("5551234").as_deref(), Some("555-1234"));
        assert_eq!(dash_phone("5551234567").as_deref(), Some("555-123-4567"));
        assert_eq!(dash_phone("15551234567").as_deref(), Some("1-555-123-4567"));
        assert_eq!(dash_phone("12345"), None);
    }
}
