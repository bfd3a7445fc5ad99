//! Raw token tree intake
//!
//! Turns one or more JSON documents into a flat list of raw leaves:
//! deep-merge the inputs, flatten file-keyed wrappers, unwrap a redundant
//! collection key, then walk groups down to `$value` leaves.

use crate::error::{Result, TokenError};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// A leaf found in the raw tree, before any parsing
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub path: Vec<String>,
    pub value: Value,
    pub declared_type: Option<String>,
    pub description: Option<String>,
}

impl RawToken {
    pub fn qualified_name(&self, separator: &str) -> String {
        self.path.join(separator)
    }
}

/// Merge `overlay` into `base`. Objects merge key by key; anything else in
/// `overlay` replaces what is in `base`.
pub fn merge_trees(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_trees(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Deep-merge inputs in order; later inputs win on conflicting leaves
pub fn merge_all(inputs: impl IntoIterator<Item = Value>) -> Value {
    let mut merged = Value::Object(Map::new());
    for input in inputs {
        merge_trees(&mut merged, input);
    }
    merged
}

pub fn is_file_wrapper(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.to_ascii_lowercase().ends_with(".json"))
}

/// Merge the contents of a `{ "file.json": {...}, ... }` wrapper
pub fn flatten_file_wrapper(map: Map<String, Value>) -> Map<String, Value> {
    if !is_file_wrapper(&map) {
        return map;
    }
    log::debug!("Flattening file wrapper with {} entries", map.len());

    let mut merged = Value::Object(Map::new());
    for (file, content) in map {
        if content.is_object() {
            merge_trees(&mut merged, content);
        } else {
            log::warn!("Ignoring '{}': file content is not an object", file);
        }
    }
    match merged {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn collection_aliases(collection: &str) -> Vec<String> {
    let name = collection.trim().to_lowercase();
    let mut aliases = vec![name.clone()];
    match name.strip_suffix('s') {
        Some(singular) if !singular.is_empty() => aliases.push(singular.to_string()),
        _ => aliases.push(format!("{}s", name)),
    }
    aliases
}

/// Unwrap a single top-level key naming the collection (singular, plural
/// or as given, case-insensitive)
pub fn unwrap_collection_key(map: Map<String, Value>, collection: &str) -> Map<String, Value> {
    if map.len() != 1 || collection.trim().is_empty() {
        return map;
    }
    let aliases = collection_aliases(collection);
    let matches = map
        .iter()
        .next()
        .map(|(key, value)| value.is_object() && aliases.contains(&key.to_lowercase()))
        .unwrap_or(false);
    if !matches {
        return map;
    }

    match map.into_iter().next() {
        Some((key, Value::Object(inner))) => {
            log::debug!("Unwrapping redundant collection key '{}'", key);
            inner
        }
        Some((key, value)) => {
            let mut map = Map::new();
            map.insert(key, value);
            map
        }
        None => Map::new(),
    }
}

/// Normalize a raw root into the group tree the walker expects
pub fn prepare_tree(root: Value, collection: &str) -> Result<Map<String, Value>> {
    let map = match root {
        Value::Object(map) => map,
        other => {
            return Err(TokenError::InvalidFormat {
                message: format!("Token root must be an object, got {}", json_type_name(&other)),
            })
        }
    };
    Ok(unwrap_collection_key(flatten_file_wrapper(map), collection))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_leaf(map: &Map<String, Value>) -> bool {
    map.contains_key("$value") || (map.contains_key("value") && map.contains_key("type"))
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| map.get(*k))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Walk the group tree in document order and collect every leaf
pub fn collect_leaves(tree: &Map<String, Value>) -> Vec<RawToken> {
    let mut leaves = Vec::new();
    let mut path = Vec::new();
    walk_group(tree, &mut path, None, &mut leaves);
    leaves
}

fn walk_group(
    group: &Map<String, Value>,
    path: &mut Vec<String>,
    inherited_type: Option<&str>,
    leaves: &mut Vec<RawToken>,
) {
    let group_type = group.get("$type").and_then(Value::as_str).or(inherited_type);

    for (key, child) in group {
        if key.starts_with('$') {
            continue;
        }
        path.push(key.clone());

        match child {
            Value::Object(map) if is_leaf(map) => {
                let value = map.get("$value").or_else(|| map.get("value")).cloned().unwrap_or(Value::Null);
                leaves.push(RawToken {
                    path: path.clone(),
                    value,
                    declared_type: string_field(map, &["$type", "type"]).or_else(|| group_type.map(str::to_string)),
                    description: string_field(map, &["$description", "description"]),
                });
            }
            Value::Object(map) => walk_group(map, path, group_type, leaves),
            Value::Null => log::debug!("Skipping null entry '{}'", path.join(".")),
            bare => leaves.push(RawToken {
                path: path.clone(),
                value: bare.clone(),
                declared_type: group_type.map(str::to_string),
                description: None,
            }),
        }

        path.pop();
    }
}

fn json_files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|e| TokenError::Io {
            message: format!("Directory traversal error: {}", e),
        })?;
        if entry.file_type().is_file() && entry.path().extension().map_or(false, |ext| ext == "json") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read JSON files (directories are searched for `*.json`, sorted by path)
/// into a file-keyed wrapper object
pub fn load_files<P: AsRef<Path>>(inputs: &[P]) -> Result<Value> {
    let mut files = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if input.is_dir() {
            files.extend(json_files_under(input)?);
        } else if input.exists() {
            files.push(input.to_path_buf());
        } else {
            return Err(TokenError::FileNotFound {
                path: input.display().to_string(),
            });
        }
    }

    let mut wrapper = Map::new();
    for file in files {
        let key = file.display().to_string();
        if !key.to_ascii_lowercase().ends_with(".json") {
            return Err(TokenError::InvalidFormat {
                message: format!("Token source {} must be a .json file", key),
            });
        }
        let content = fs::read_to_string(&file).map_err(|e| TokenError::FileNotFound {
            path: format!("{}: {}", key, e),
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| TokenError::InvalidFormat {
            message: format!("Invalid JSON in {}: {}", key, e),
        })?;
        log::info!("Loaded token source {}", key);
        wrapper.insert(key, value);
    }
    Ok(Value::Object(wrapper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_file_wrapper_with_collection_key_flattens() {
        let root = json!({ "tokens.json": { "tokens": { "color": { "red": { "$value": "#f00" } } } } });
        let tree = prepare_tree(root, "token").unwrap();
        assert_eq!(Value::Object(tree), json!({ "color": { "red": { "$value": "#f00" } } }));

        let plain = json!({ "tokens.json": { "color": { "red": { "$value": "#f00" } } } });
        let tree = prepare_tree(plain, "tokens").unwrap();
        assert_eq!(Value::Object(tree), json!({ "color": { "red": { "$value": "#f00" } } }));
    }

    #[test]
    fn test_collection_key_is_case_insensitive() {
        let root = as_map(json!({ "Primitives": { "space": { "sm": { "$value": 4 } } } }));
        let tree = unwrap_collection_key(root, "primitive");
        assert!(tree.contains_key("space"));

        let kept = as_map(json!({ "brand": { "x": 1 } }));
        assert!(unwrap_collection_key(kept, "primitive").contains_key("brand"));
    }

    #[test]
    fn test_later_inputs_win() {
        let merged = merge_all(vec![
            json!({ "color": { "a": { "$value": "#000" }, "b": { "$value": "#111" } } }),
            json!({ "color": { "a": { "$value": "#fff" } } }),
        ]);
        assert_eq!(merged["color"]["a"]["$value"], "#fff");
        assert_eq!(merged["color"]["b"]["$value"], "#111");
    }

    #[test]
    fn test_non_object_root_is_rejected() {
        let err = prepare_tree(json!([1, 2]), "core").unwrap_err();
        assert!(matches!(err, TokenError::InvalidFormat { .. }));
    }

    #[test]
    fn test_collect_leaves_inherits_group_type() {
        let tree = as_map(json!({
            "$schema": "ignored",
            "space": {
                "$type": "spacing",
                "sm": { "$value": "4px", "$description": "small" },
                "lg": { "$value": "24px", "$type": "dimension" }
            },
            "legacy": { "value": "#000", "type": "color" },
            "ratio": 1.5
        }));
        let leaves = collect_leaves(&tree);
        let names: Vec<_> = leaves.iter().map(|l| l.qualified_name("/")).collect();
        assert_eq!(names, vec!["space/sm", "space/lg", "legacy", "ratio"]);

        assert_eq!(leaves[0].declared_type.as_deref(), Some("spacing"));
        assert_eq!(leaves[0].description.as_deref(), Some("small"));
        assert_eq!(leaves[1].declared_type.as_deref(), Some("dimension"));
        assert_eq!(leaves[2].declared_type.as_deref(), Some("color"));
        assert_eq!(leaves[3].declared_type, None);
        assert_eq!(leaves[3].value, json!(1.5));
    }

    #[test]
    fn test_load_directory_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.json"), r#"{ "b": { "$value": 2 } }"#).unwrap();
        fs::write(dir.path().join("nested/a.json"), r#"{ "a": { "$value": 1 } }"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let wrapper = load_files(&[dir.path()]).unwrap();
        let map = as_map(wrapper);
        assert!(is_file_wrapper(&map));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with("b.json"));
        assert!(keys[1].ends_with("a.json"));

        let tree = prepare_tree(Value::Object(map), "core").unwrap();
        assert!(tree.contains_key("a") && tree.contains_key("b"));
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_files(&[&missing]), Err(TokenError::FileNotFound { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(load_files(&[&broken]), Err(TokenError::InvalidFormat { .. })));
    }
}
