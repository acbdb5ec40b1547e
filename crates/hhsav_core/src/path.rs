use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Address of a node in the document. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_key(&self) -> Option<&str> {
        self.0.first().and_then(PathSegment::as_key)
    }

    pub fn last_key(&self) -> Option<&str> {
        self.0.last().and_then(PathSegment::as_key)
    }

    pub fn prefix(&self, len: usize) -> Path {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// Renders the path the way the diagnostics log records it: `['AppStore', 0]`.
    pub fn repr(&self) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => {
                    format!("'{}'", key.replace('\\', "\\\\").replace('\'', "\\'"))
                }
                PathSegment::Index(index) => index.to_string(),
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }

    /// Splits a slash-separated path without consulting a document; purely
    /// numeric segments become indices.
    pub fn parse(raw: &str) -> Path {
        Self(
            split_raw(raw)
                .map(|part| match part.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(part.to_string()),
                })
                .collect(),
        )
    }

    /// Splits a slash-separated path, choosing index or key per segment from the
    /// container actually found in `document`. Segments past the existing tree
    /// fall back to the numeric heuristic of [`Path::parse`].
    pub fn parse_against(document: &Value, raw: &str) -> Path {
        let mut node = Some(document);
        let mut segments = Vec::new();
        for part in split_raw(raw) {
            let segment = match node {
                Some(Value::Object(map)) => {
                    node = map.get(part);
                    PathSegment::Key(part.to_string())
                }
                Some(Value::Array(items)) => match part.parse::<usize>() {
                    Ok(index) => {
                        node = items.get(index);
                        PathSegment::Index(index)
                    }
                    Err(_) => {
                        node = None;
                        PathSegment::Key(part.to_string())
                    }
                },
                _ => {
                    node = None;
                    match part.parse::<usize>() {
                        Ok(index) => PathSegment::Index(index),
                        Err(_) => PathSegment::Key(part.to_string()),
                    }
                }
            };
            segments.push(segment);
        }
        Self(segments)
    }
}

fn split_raw(raw: &str) -> impl Iterator<Item = &str> {
    raw.split('/').filter(|part| !part.is_empty())
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Path, PathSegment};

    #[test]
    fn repr_matches_log_format() {
        let path = Path::new(vec!["AppStore".into(), 0.into(), "it's".into()]);
        assert_eq!(path.repr(), "['AppStore', 0, 'it\\'s']");
        assert_eq!(Path::root().repr(), "[]");
    }

    #[test]
    fn parse_against_prefers_keys_inside_mappings() {
        let doc = json!({"slots": {"0": "a"}, "items": [{"id": 1}]});
        let path = Path::parse_against(&doc, "slots/0");
        assert_eq!(path.segments()[1], PathSegment::Key("0".to_string()));

        let path = Path::parse_against(&doc, "/items/0/id");
        assert_eq!(
            path,
            Path::new(vec!["items".into(), 0.into(), "id".into()])
        );
    }

    #[test]
    fn display_joins_with_slashes() {
        assert_eq!(Path::parse("AppStore/3").to_string(), "AppStore/3");
        assert_eq!(Path::root().to_string(), "/");
    }
}
