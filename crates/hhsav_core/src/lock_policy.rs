use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::label_format::humanize_key;
use crate::path::{Path, PathSegment};

/// One registry entry: the root categories it guards and the member keys that
/// may never change underneath them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockPolicy {
    pub id: String,
    pub root_names: Vec<String>,
    pub locked_keys: Vec<String>,
    /// Overlay text; `{root}` and `{field}` are substituted.
    pub detail_template: String,
    #[serde(default)]
    pub highlight_root_only: bool,
}

impl LockPolicy {
    pub fn status_restored(&self) -> String {
        format!("locked_restored_{}", self.id)
    }

    pub fn status_blocked(&self) -> String {
        format!("locked_blocked_{}", self.id)
    }

    pub fn render_detail(&self, root: &str, field: &str) -> String {
        self.detail_template
            .replace("{root}", root)
            .replace("{field}", field)
    }
}

pub fn builtin_policies() -> Vec<LockPolicy> {
    vec![
        LockPolicy {
            id: "appstore_progression".to_string(),
            root_names: vec!["AppStore".to_string()],
            locked_keys: vec![
                "unlockedMarketItems".to_string(),
                "purchasedApps".to_string(),
            ],
            detail_template: "{field} is locked under {root}; purchases only change through play."
                .to_string(),
            highlight_root_only: false,
        },
        LockPolicy {
            id: "achievement_history".to_string(),
            root_names: vec!["Achievements".to_string()],
            locked_keys: vec!["unlocked".to_string(), "unlockedAt".to_string()],
            detail_template: "{field} is locked under {root}; achievement history is read-only."
                .to_string(),
            highlight_root_only: true,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("root name `{name}` is claimed by both `{first}` and `{second}`")]
    DuplicateRootName {
        name: String,
        first: String,
        second: String,
    },
    #[error("policy `{id}` has no locked keys")]
    EmptyLockedKeys { id: String },
    #[error("policy `{id}` has no root names")]
    EmptyRootNames { id: String },
}

/// A locked field whose value an edit would change.
#[derive(Debug, Clone, PartialEq)]
pub struct LockViolation<'r> {
    pub path: Path,
    pub field: String,
    pub label: String,
    pub policy: &'r LockPolicy,
}

impl LockViolation<'_> {
    pub fn detail(&self) -> String {
        let root = self.path.first_key().map(humanize_key).unwrap_or_default();
        self.policy.render_detail(&root, &self.label)
    }
}

/// Frozen policy table with normalized lookups.
#[derive(Debug, Clone)]
pub struct LockRegistry {
    policies: Vec<LockPolicy>,
    by_root: HashMap<String, usize>,
    locked: Vec<HashSet<String>>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LockRegistry {
    /// Validates that every policy names at least one root and one locked key
    /// and that no normalized root name is claimed twice.
    pub fn new(policies: Vec<LockPolicy>) -> Result<Self, RegistryError> {
        let mut owners: HashMap<String, usize> = HashMap::new();
        for (index, policy) in policies.iter().enumerate() {
            if policy.root_names.is_empty() {
                return Err(RegistryError::EmptyRootNames {
                    id: policy.id.clone(),
                });
            }
            if policy.locked_keys.is_empty() {
                return Err(RegistryError::EmptyLockedKeys {
                    id: policy.id.clone(),
                });
            }
            for name in &policy.root_names {
                let owner = *owners.entry(normalize_root(name)).or_insert(index);
                if owner != index {
                    return Err(RegistryError::DuplicateRootName {
                        name: name.clone(),
                        first: policies[owner].id.clone(),
                        second: policy.id.clone(),
                    });
                }
            }
        }
        Ok(Self::index(policies))
    }

    pub fn builtin() -> Self {
        Self::index(builtin_policies())
    }

    fn index(policies: Vec<LockPolicy>) -> Self {
        let mut by_root = HashMap::new();
        let mut locked = Vec::with_capacity(policies.len());
        for (index, policy) in policies.iter().enumerate() {
            for name in &policy.root_names {
                by_root.entry(normalize_root(name)).or_insert(index);
            }
            locked.push(
                policy
                    .locked_keys
                    .iter()
                    .map(|key| key.to_lowercase())
                    .collect(),
            );
        }
        Self {
            policies,
            by_root,
            locked,
        }
    }

    pub fn policies(&self) -> &[LockPolicy] {
        &self.policies
    }

    pub fn policy_for_root(&self, name: &str) -> Option<&LockPolicy> {
        self.root_index(name).map(|index| &self.policies[index])
    }

    pub fn policy_for_path(&self, path: &Path) -> Option<&LockPolicy> {
        self.path_index(path).map(|index| &self.policies[index])
    }

    pub fn is_locked_root(&self, path: &Path) -> bool {
        path.len() == 1 && self.path_index(path).is_some()
    }

    pub fn is_locked_field(&self, path: &Path) -> bool {
        self.locked_field(path).is_some()
    }

    /// Deepest path component (past the root) naming a locked key, with its
    /// position in the path.
    pub fn locked_field<'p>(&self, path: &'p Path) -> Option<(usize, &'p str)> {
        if path.len() < 2 {
            return None;
        }
        let index = self.path_index(path)?;
        path.segments()
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find_map(|(depth, segment)| {
                let key = segment.as_key()?;
                self.is_locked_key(index, key).then_some((depth, key))
            })
    }

    /// Field names to mark as locked while viewing `path`.
    pub fn locked_highlight_fields(&self, path: &Path) -> Vec<String> {
        let Some(policy) = self.policy_for_path(path) else {
            return Vec::new();
        };
        if path.len() == 1 {
            return policy.locked_keys.clone();
        }
        if policy.highlight_root_only {
            return Vec::new();
        }
        self.locked_field(path)
            .map(|(_, key)| vec![key.to_string()])
            .unwrap_or_default()
    }

    pub fn detect_violation(
        &self,
        path: &Path,
        old: &Value,
        new: &Value,
    ) -> Option<LockViolation<'_>> {
        if path.is_root() {
            let (Value::Object(old_map), Value::Object(new_map)) = (old, new) else {
                return None;
            };
            return old_map.iter().find_map(|(category, old_child)| {
                let new_child = new_map.get(category)?;
                let category_path = Path::new(vec![category.as_str().into()]);
                self.detect_violation(&category_path, old_child, new_child)
            });
        }
        let index = self.path_index(path)?;
        let policy = &self.policies[index];

        if let Some((_, key)) = self.locked_field(path) {
            return (old != new).then(|| LockViolation {
                path: path.clone(),
                field: key.to_string(),
                label: humanize_key(key),
                policy,
            });
        }

        let mut cursor = path.clone();
        let mut deepest = None;
        self.deepest_change(index, &mut cursor, old, new, &mut deepest);
        deepest.map(|(path, field)| LockViolation {
            label: humanize_key(&field),
            path,
            field,
            policy,
        })
    }

    /// Copies every locked field of `old` back into `new`. A path that is
    /// itself a locked field cannot be repaired and comes back unchanged.
    pub fn restore(&self, path: &Path, old: &Value, new: &Value) -> (bool, Value) {
        if path.is_root() {
            let (Value::Object(old_map), Value::Object(new_map)) = (old, new) else {
                return (false, new.clone());
            };
            let mut restored = new_map.clone();
            let mut changed = false;
            for (category, old_child) in old_map {
                let Some(new_child) = new_map.get(category) else {
                    continue;
                };
                let (child_changed, value) =
                    self.restore(&Path::new(vec![category.as_str().into()]), old_child, new_child);
                if child_changed {
                    restored.insert(category.clone(), value);
                    changed = true;
                }
            }
            return (changed, Value::Object(restored));
        }

        let Some(index) = self.path_index(path) else {
            return (false, new.clone());
        };
        if self.locked_field(path).is_some() {
            return (false, new.clone());
        }
        let mut restored = new.clone();
        let changed = self.restore_into(index, old, &mut restored);
        (changed, restored)
    }

    fn deepest_change(
        &self,
        index: usize,
        cursor: &mut Path,
        old: &Value,
        new: &Value,
        deepest: &mut Option<(Path, String)>,
    ) {
        match (old, new) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                for (key, old_child) in old_map {
                    let new_child = new_map.get(key);
                    cursor.push(key.as_str());
                    if self.is_locked_key(index, key) && new_child != Some(old_child) {
                        let deeper = deepest
                            .as_ref()
                            .is_none_or(|(found, _)| cursor.len() > found.len());
                        if deeper {
                            *deepest = Some((cursor.clone(), key.clone()));
                        }
                    }
                    if let Some(new_child) = new_child {
                        self.deepest_change(index, cursor, old_child, new_child, deepest);
                    }
                    cursor.pop();
                }
            }
            (Value::Array(old_items), Value::Array(new_items)) => {
                let pairs = old_items.iter().zip(new_items);
                for (position, (old_item, new_item)) in pairs.enumerate() {
                    cursor.push(position);
                    self.deepest_change(index, cursor, old_item, new_item, deepest);
                    cursor.pop();
                }
            }
            _ => {}
        }
    }

    fn restore_into(&self, index: usize, old: &Value, new: &mut Value) -> bool {
        match (old, new) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                restore_members(old_map, new_map, |key, old_child, new_child| {
                    if self.is_locked_key(index, key) {
                        None
                    } else {
                        Some(self.restore_into(index, old_child, new_child))
                    }
                })
            }
            (Value::Array(old_items), Value::Array(new_items)) => {
                let mut changed = false;
                for (old_item, new_item) in old_items.iter().zip(new_items.iter_mut()) {
                    changed |= self.restore_into(index, old_item, new_item);
                }
                changed
            }
            _ => false,
        }
    }

    fn is_locked_key(&self, index: usize, key: &str) -> bool {
        self.locked[index].contains(&key.to_lowercase())
    }

    fn root_index(&self, name: &str) -> Option<usize> {
        self.by_root.get(&normalize_root(name)).copied()
    }

    fn path_index(&self, path: &Path) -> Option<usize> {
        match path.segments().first()? {
            PathSegment::Key(name) => self.root_index(name),
            PathSegment::Index(_) => None,
        }
    }
}

/// Walks the members of `old`. `descend` returns `None` for a locked key,
/// which is then copied back verbatim when it differs, or `Some(changed)`
/// after recursing into an unlocked one.
fn restore_members<F>(
    old: &Map<String, Value>,
    new: &mut Map<String, Value>,
    mut descend: F,
) -> bool
where
    F: FnMut(&str, &Value, &mut Value) -> Option<bool>,
{
    let mut changed = false;
    for (key, old_child) in old {
        match new.get_mut(key) {
            Some(new_child) => match descend(key, old_child, new_child) {
                Some(child_changed) => changed |= child_changed,
                None if new_child != old_child => {
                    *new_child = old_child.clone();
                    changed = true;
                }
                None => {}
            },
            None => {
                let locked = descend(key, old_child, &mut Value::Null).is_none();
                if locked {
                    new.insert(key.clone(), old_child.clone());
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Root names compare lower-cased with everything but letters and digits removed.
pub fn normalize_root(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
