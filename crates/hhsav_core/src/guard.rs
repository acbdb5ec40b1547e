use serde::Serialize;
use serde_json::Value;

use crate::path::Path;

/// First mapping whose key set an edit changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyChange {
    pub path: Path,
    pub missing: Vec<String>,
    pub added: Vec<String>,
    pub type_changed: bool,
}

/// Walks `old` and `new` together and reports the first mapping that lost or
/// gained keys, or was replaced by a non-mapping. Scalars may change freely
/// and sequences may change length.
pub fn first_key_change(old: &Value, new: &Value, current: &Path) -> Option<KeyChange> {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let missing: Vec<String> = old_map
                .keys()
                .filter(|key| !new_map.contains_key(*key))
                .cloned()
                .collect();
            let added: Vec<String> = new_map
                .keys()
                .filter(|key| !old_map.contains_key(*key))
                .cloned()
                .collect();
            if !missing.is_empty() || !added.is_empty() {
                return Some(KeyChange {
                    path: current.clone(),
                    missing,
                    added,
                    type_changed: false,
                });
            }
            old_map.iter().find_map(|(key, old_child)| {
                let new_child = new_map.get(key)?;
                first_key_change(old_child, new_child, &current.child(key.as_str()))
            })
        }
        (Value::Object(old_map), _) => Some(KeyChange {
            path: current.clone(),
            missing: old_map.keys().cloned().collect(),
            added: Vec::new(),
            type_changed: true,
        }),
        (Value::Array(old_items), Value::Array(new_items)) => old_items
            .iter()
            .zip(new_items)
            .enumerate()
            .find_map(|(index, (old_item, new_item))| {
                first_key_change(old_item, new_item, &current.child(index))
            }),
        _ => None,
    }
}
