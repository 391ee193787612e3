//! Flat JSON key/value files behind `save` and `load`
//!
//! A store file holds one JSON object. Reads treat a missing, unreadable or
//! malformed file as an empty object; write failures are logged and
//! dropped. Neither ever stops a run.

use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::io;
use std::path::Path;

use crate::types::Context;

/// Read the whole store at `path`.
pub fn read_store(path: &Path) -> Map<String, JsonValue> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Map::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable store, treating as empty");
            return Map::new();
        }
    };

    if text.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<JsonValue>(&text) {
        Ok(JsonValue::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "store is not a JSON object, treating as empty");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed store, treating as empty");
            Map::new()
        }
    }
}

/// Merge `{var: value}` into the store at `path`.
pub fn save_var(path: &Path, var: &str, value: &str) {
    if let Err(e) = write_var(path, var, value) {
        tracing::warn!(path = %path.display(), var, error = %e, "failed to save variable");
    }
}

fn write_var(path: &Path, var: &str, value: &str) -> io::Result<()> {
    let mut data = read_store(path);
    data.insert(var.to_string(), JsonValue::String(value.to_string()));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let text = serde_json::to_string_pretty(&JsonValue::Object(data))?;
    fs::write(path, text)
}

/// Look up one variable. `None` when the file or the key is missing.
pub fn load_var(path: &Path, var: &str) -> Option<String> {
    read_store(path).get(var).map(string_form)
}

/// Every entry of the store as context values.
pub fn load_all(path: &Path) -> Context {
    read_store(path)
        .iter()
        .map(|(key, value)| (key.clone(), string_form(value)))
        .collect()
}

fn string_form(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_parent_dirs_and_merges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/store.json");

        save_var(&path, "name", "Ann");
        save_var(&path, "city", "Zürich");
        save_var(&path, "name", "Bo");

        let data = read_store(&path);
        assert_eq!(data.len(), 2);
        assert_eq!(data["name"], JsonValue::from("Bo"));
        assert_eq!(data["city"], JsonValue::from("Zürich"));

        // written pretty and without escaping non-ASCII
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n"));
        assert!(text.contains("Zürich"));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        assert!(read_store(&path).is_empty());
        assert_eq!(load_var(&path, "name"), None);
    }

    #[test]
    fn test_malformed_file_is_replaced_on_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        assert!(read_store(&path).is_empty());
        save_var(&path, "k", "v");
        assert_eq!(load_var(&path, "k"), Some("v".to_string()));
    }

    #[test]
    fn test_non_string_values_load_as_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"n": 3, "flag": true, "none": null, "s": "x"}"#).unwrap();

        let ctx = load_all(&path);
        assert_eq!(ctx["n"], "3");
        assert_eq!(ctx["flag"], "true");
        assert_eq!(ctx["none"], "");
        assert_eq!(ctx["s"], "x");
    }

    #[test]
    fn test_non_object_store_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert_eq!(load_var(&path, "0"), None);
    }
}
