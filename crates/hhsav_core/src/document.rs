use serde_json::{Map, Value};
use thiserror::Error;

use crate::parser;
use crate::path::{Path, PathSegment};

/// Adjacent-append writes never grow a sequence shallower than this: the
/// document root and the root categories.
const MIN_GROWABLE_SEQUENCE_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("path {path} does not exist")]
    PathMissing { path: Path },
    #[error("index {index} is out of range at {path} (length {len})")]
    IndexOutOfRange { path: Path, index: usize, len: usize },
    #[error("refusing to grow top-level sequence at {path}")]
    TopLevelGrowthRefused { path: Path },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Lets an intermediate index equal to the current sequence length create
    /// a fresh empty container (INPUT-mode set-nested-value). Top-level
    /// sequences stay fixed in length under this flag, final index included.
    pub allow_adjacent_append: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    document: Value,
    selection: Path,
}

/// Sole owner of the parsed save document and the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStore {
    document: Value,
    selection: Path,
}

impl DocumentStore {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            selection: Path::root(),
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn selection(&self) -> &Path {
        &self.selection
    }

    pub fn select(&mut self, path: Path) -> Result<(), StoreError> {
        self.read(&path)?;
        self.selection = path;
        Ok(())
    }

    pub fn read(&self, path: &Path) -> Result<&Value, StoreError> {
        let mut node = &self.document;
        for (depth, segment) in path.segments().iter().enumerate() {
            node = match (node, segment) {
                (Value::Object(map), PathSegment::Key(key)) => map
                    .get(key)
                    .ok_or_else(|| missing(path, depth))?,
                (Value::Array(items), PathSegment::Index(index)) => {
                    items.get(*index).ok_or_else(|| StoreError::IndexOutOfRange {
                        path: path.prefix(depth),
                        index: *index,
                        len: items.len(),
                    })?
                }
                _ => return Err(missing(path, depth)),
            };
        }
        Ok(node)
    }

    pub fn write(&mut self, path: &Path, value: Value) -> Result<(), StoreError> {
        self.write_with(path, value, WriteOptions::default())
    }

    pub fn write_with(
        &mut self,
        path: &Path,
        value: Value,
        options: WriteOptions,
    ) -> Result<(), StoreError> {
        let Some((last, parents)) = path.segments().split_last() else {
            self.document = value;
            return Ok(());
        };

        let mut node = &mut self.document;
        for (depth, segment) in parents.iter().enumerate() {
            node = match (node, segment) {
                (Value::Object(map), PathSegment::Key(key)) => map
                    .get_mut(key)
                    .ok_or_else(|| missing(path, depth))?,
                (Value::Array(items), PathSegment::Index(index)) => {
                    if *index == items.len() && options.allow_adjacent_append {
                        if depth < MIN_GROWABLE_SEQUENCE_DEPTH {
                            return Err(StoreError::TopLevelGrowthRefused {
                                path: path.prefix(depth),
                            });
                        }
                        items.push(empty_container_for(&path.segments()[depth + 1]));
                    }
                    let len = items.len();
                    items
                        .get_mut(*index)
                        .ok_or_else(|| StoreError::IndexOutOfRange {
                            path: path.prefix(depth),
                            index: *index,
                            len,
                        })?
                }
                _ => return Err(missing(path, depth)),
            };
        }

        let depth = parents.len();
        match (node, last) {
            (Value::Object(map), PathSegment::Key(key)) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            (Value::Array(items), PathSegment::Index(index)) => {
                if *index < items.len() {
                    items[*index] = value;
                    Ok(())
                } else if *index == items.len() {
                    if options.allow_adjacent_append && depth < MIN_GROWABLE_SEQUENCE_DEPTH {
                        return Err(StoreError::TopLevelGrowthRefused {
                            path: path.prefix(depth),
                        });
                    }
                    items.push(value);
                    Ok(())
                } else {
                    Err(StoreError::IndexOutOfRange {
                        path: path.prefix(depth),
                        index: *index,
                        len: items.len(),
                    })
                }
            }
            _ => Err(missing(path, depth)),
        }
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            document: self.document.clone(),
            selection: self.selection.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.document = snapshot.document;
        self.selection = snapshot.selection;
    }

    /// Normalized text of the whole document.
    pub fn encode(&self) -> String {
        parser::encode_document(&self.document)
    }

    pub fn into_document(self) -> Value {
        self.document
    }
}

fn missing(path: &Path, depth: usize) -> StoreError {
    StoreError::PathMissing {
        path: path.prefix(depth + 1),
    }
}

fn empty_container_for(next: &PathSegment) -> Value {
    match next {
        PathSegment::Key(_) => Value::Object(Map::new()),
        PathSegment::Index(_) => Value::Array(Vec::new()),
    }
}
