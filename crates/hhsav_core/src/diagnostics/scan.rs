use super::LineSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Opener {
    pub symbol: char,
    pub line: usize,
    pub column: usize,
}

/// A `"key"<ws>:<ws>` prefix. All positions are character offsets into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyLine {
    pub indent: usize,
    pub key_end: usize,
    pub colon: usize,
    pub value_start: usize,
}

impl KeyLine {
    pub fn key<'a>(&self, chars: &'a [char]) -> &'a [char] {
        &chars[self.indent + 1..self.key_end - 1]
    }

    pub fn key_string(&self, chars: &[char]) -> String {
        self.key(chars).iter().collect()
    }
}

pub(crate) fn is_closer(c: char) -> bool {
    matches!(c, '}' | ']')
}

pub(crate) fn is_opener(c: char) -> bool {
    matches!(c, '{' | '[')
}

pub(crate) fn closer_for(opener: char) -> char {
    if opener == '[' { ']' } else { '}' }
}

pub(crate) fn indent_len(chars: &[char]) -> usize {
    chars.iter().take_while(|c| c.is_whitespace()).count()
}

pub(crate) fn skip_ws(chars: &[char], from: usize) -> usize {
    let mut cursor = from;
    while chars.get(cursor).is_some_and(|c| c.is_whitespace()) {
        cursor += 1;
    }
    cursor
}

/// Length of the line once trailing whitespace is ignored.
pub(crate) fn trimmed_len(chars: &[char]) -> usize {
    chars.len()
        - chars
            .iter()
            .rev()
            .take_while(|c| c.is_whitespace())
            .count()
}

pub(crate) fn last_significant(chars: &[char]) -> Option<(usize, char)> {
    let len = trimmed_len(chars);
    if len == 0 {
        return None;
    }
    Some((len - 1, chars[len - 1]))
}

/// End (exclusive) of the string literal opening at `start`, honoring
/// backslash escapes. `None` when the quote is never closed on this line.
pub(crate) fn scan_string(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start) != Some(&'"') {
        return None;
    }
    let mut cursor = start + 1;
    while let Some(&c) = chars.get(cursor) {
        match c {
            '\\' => cursor += 2,
            '"' => return Some(cursor + 1),
            _ => cursor += 1,
        }
    }
    None
}

pub(crate) fn parse_key_line(chars: &[char]) -> Option<KeyLine> {
    let indent = indent_len(chars);
    let key_end = scan_string(chars, indent)?;
    let colon = skip_ws(chars, key_end);
    if chars.get(colon) != Some(&':') {
        return None;
    }
    Some(KeyLine {
        indent,
        key_end,
        colon,
        value_start: skip_ws(chars, colon + 1),
    })
}

/// End (exclusive) of the JSON scalar starting at `start`: a string literal,
/// the longest valid number prefix, or an exact `true`/`false`/`null`.
pub(crate) fn scalar_end(chars: &[char], start: usize) -> Option<usize> {
    match chars.get(start)? {
        '"' => scan_string(chars, start),
        '-' | '0'..='9' => number_end(chars, start),
        _ => ["true", "false", "null"].iter().find_map(|literal| {
            let len = literal.chars().count();
            let candidate = chars.get(start..start + len)?;
            candidate
                .iter()
                .copied()
                .eq(literal.chars())
                .then_some(start + len)
        }),
    }
}

fn number_end(chars: &[char], start: usize) -> Option<usize> {
    let digit_at = |i: usize| chars.get(i).is_some_and(|c| c.is_ascii_digit());
    let mut cursor = start;
    if chars.get(cursor) == Some(&'-') {
        cursor += 1;
    }
    if !digit_at(cursor) {
        return None;
    }
    if chars[cursor] == '0' {
        cursor += 1;
    } else {
        while digit_at(cursor) {
            cursor += 1;
        }
    }
    if chars.get(cursor) == Some(&'.') && digit_at(cursor + 1) {
        cursor += 1;
        while digit_at(cursor) {
            cursor += 1;
        }
    }
    if matches!(chars.get(cursor), Some('e' | 'E')) {
        let mut exp = cursor + 1;
        if matches!(chars.get(exp), Some('+' | '-')) {
            exp += 1;
        }
        if digit_at(exp) {
            cursor = exp;
            while digit_at(cursor) {
                cursor += 1;
            }
        }
    }
    Some(cursor)
}

pub(crate) fn is_value_start(c: char) -> bool {
    matches!(c, '"' | '{' | '[' | '-' | '0'..='9' | 't' | 'f' | 'n')
}

/// Rescans from the top of the text up to `(line, column)` and returns the
/// openers still waiting for a closer. Brackets inside string literals are
/// ignored, and a mismatched closer leaves the stack untouched so the active
/// container stays on top. String state resets at each line break since a
/// JSON string can never span lines.
pub(crate) fn opener_stack(lines: &dyn LineSource, line: usize, column: usize) -> Vec<Opener> {
    let mut stack = Vec::new();
    for current in 1..=line {
        let Some(text) = lines.line_text(current) else {
            break;
        };
        let limit = if current == line { column } else { usize::MAX };
        let mut in_string = false;
        let mut escaped = false;
        for (col, c) in text.chars().enumerate() {
            if col >= limit {
                break;
            }
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                c if is_opener(c) => stack.push(Opener {
                    symbol: c,
                    line: current,
                    column: col,
                }),
                c if is_closer(c) => {
                    if stack.last().is_some_and(|top| closer_for(top.symbol) == c) {
                        stack.pop();
                    }
                }
                _ => {}
            }
        }
    }
    stack
}

pub(crate) fn expected_closer(lines: &dyn LineSource, line: usize, column: usize) -> Option<char> {
    opener_stack(lines, line, column)
        .last()
        .map(|top| closer_for(top.symbol))
}

#[cfg(test)]
mod tests {
    use super::super::TextLines;
    use super::*;

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn scalar_end_takes_longest_number_prefix() {
        assert_eq!(scalar_end(&chars("12abc"), 0), Some(2));
        assert_eq!(scalar_end(&chars("-0.5e+3,"), 0), Some(7));
        assert_eq!(scalar_end(&chars("1."), 0), Some(1));
        assert_eq!(scalar_end(&chars("-x"), 0), None);
        assert_eq!(scalar_end(&chars("trueish"), 0), Some(4));
        assert_eq!(scalar_end(&chars("\"a\\\"b\" x"), 0), Some(6));
    }

    #[test]
    fn opener_stack_ignores_brackets_in_strings() {
        let text = "{\n  \"a\": \"[{\",\n  \"b\": [\n";
        let lines = TextLines::new(text);
        let stack = opener_stack(&lines, 3, 8);
        let symbols: Vec<char> = stack.iter().map(|o| o.symbol).collect();
        assert_eq!(symbols, vec!['{', '[']);
        assert_eq!(expected_closer(&lines, 3, 8), Some(']'));
    }

    #[test]
    fn mismatched_closer_does_not_pop() {
        let lines = TextLines::new("{\n  \"a\": [1\n  }\n");
        assert_eq!(expected_closer(&lines, 4, 0), Some(']'));
    }

    #[test]
    fn key_line_positions_are_character_offsets() {
        let line = chars("  \"é\":1");
        let key = parse_key_line(&line).expect("key line should parse");
        assert_eq!(key.indent, 2);
        assert_eq!(key.key_end, 5);
        assert_eq!(key.colon, 5);
        assert_eq!(key.value_start, 6);
        assert_eq!(key.key_string(&line), "é");
    }
}
