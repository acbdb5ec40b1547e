use crate::path::{Path, PathSegment};

const ROOT_LABEL: &str = "Document";
const BREADCRUMB_SEPARATOR: &str = " > ";

/// `unlockedMarketItems` -> `Unlocked Market Items`, `purchased_apps` ->
/// `Purchased Apps`. Acronym runs stay together (`userID` -> `User ID`).
pub fn humanize_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ' | '.') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let prev = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();
        let boundary = c.is_uppercase()
            && prev.is_some_and(|p| {
                p.is_lowercase()
                    || p.is_ascii_digit()
                    || (p.is_uppercase() && next.is_some_and(char::is_lowercase))
            });
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn segment_label(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(key) => humanize_key(key),
        PathSegment::Index(index) => index.to_string(),
    }
}

/// Breadcrumb for a selection: `App Store > Unlocked Market Items > 0`.
pub fn format_path_label(path: &Path) -> String {
    if path.is_root() {
        return ROOT_LABEL.to_string();
    }
    path.segments()
        .iter()
        .map(segment_label)
        .collect::<Vec<_>>()
        .join(BREADCRUMB_SEPARATOR)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
