//! Preference persistence.
//!
//! The host environment's key/value storage is modeled as the [`KvStore`]
//! trait (string keys, string values). [`MemoryStore`] backs tests and
//! single-session use; [`JsonFileStore`] persists across sessions as one
//! JSON object on disk, written atomically (temp file, then rename).
//!
//! [`Preference`] is the one setting this crate owns: a boolean stored
//! under [`HIDE_KANJI_KEY`] as the literal string `"true"` or `"false"`.
//! An absent or malformed value reads as `false`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::Error;

/// Storage key for the hide-kanji preference.
pub const HIDE_KANJI_KEY: &str = "hideKanjiEnabled";

/// String key/value storage, the shape of the host page's persistence.
pub trait KvStore {
    /// Read a value; `None` when the key was never set.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value, persisting it if the store is durable.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;
}

/// Volatile in-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.into(), value.into());
        Ok(())
    }
}

/// Durable store backed by a single JSON object file.
///
/// A missing, unreadable, or malformed file degrades to an empty store;
/// non-string values in the object are ignored. Every `set` rewrites the
/// file atomically via a temp file in the same directory.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect(),
                _ => {
                    log::debug!(
                        "preference file {} is not a JSON object; starting empty",
                        path.display()
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), Error> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| Error::Store(format!("create {}: {}", parent.display(), e)))?;

        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.insert(k.clone(), Value::String(v.clone()));
        }

        let temp = NamedTempFile::new_in(parent)
            .map_err(|e| Error::Store(format!("temp file in {}: {}", parent.display(), e)))?;
        let mut writer = BufWriter::new(&temp);
        serde_json::to_writer(&mut writer, &Value::Object(map))
            .map_err(|e| Error::Store(format!("serialize {}: {}", self.path.display(), e)))?;
        writer
            .flush()
            .map_err(|e| Error::Store(format!("flush {}: {}", self.path.display(), e)))?;
        drop(writer);
        temp.persist(&self.path)
            .map_err(|e| Error::Store(format!("persist {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.into(), value.into());
        self.flush()
    }
}

/// The hide-kanji preference, read once per page session and threaded
/// explicitly into whichever handler needs it.
#[derive(Clone, Debug)]
pub struct Preference<S: KvStore> {
    store: S,
}

impl<S: KvStore> Preference<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// True iff the stored value is exactly `"true"`. Absent or any other
    /// value (including `"True"` or garbage) reads as `false`.
    pub fn get(&self) -> bool {
        self.store.get(HIDE_KANJI_KEY).as_deref() == Some("true")
    }

    /// Write the preference as the literal string `"true"` / `"false"`.
    pub fn set(&mut self, value: bool) -> Result<(), Error> {
        self.store
            .set(HIDE_KANJI_KEY, if value { "true" } else { "false" })
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Unwrap back into the store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_round_trip() {
        let mut pref = Preference::new(MemoryStore::new());
        assert!(!pref.get(), "fresh store reads false");
        pref.set(true).expect("set true");
        assert!(pref.get());
        pref.set(false).expect("set false");
        assert!(!pref.get());
    }

    #[test]
    fn test_preference_stored_as_literal_strings() {
        let mut pref = Preference::new(MemoryStore::new());
        pref.set(true).expect("set");
        assert_eq!(pref.store().get(HIDE_KANJI_KEY).as_deref(), Some("true"));
        pref.set(false).expect("set");
        assert_eq!(pref.store().get(HIDE_KANJI_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn test_malformed_value_reads_false() {
        let mut store = MemoryStore::new();
        store.set(HIDE_KANJI_KEY, "True").expect("set");
        assert!(!Preference::new(store).get());
        let mut store = MemoryStore::new();
        store.set(HIDE_KANJI_KEY, "1").expect("set");
        assert!(!Preference::new(store).get());
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");

        let mut pref = Preference::new(JsonFileStore::open(&path));
        pref.set(true).expect("set");
        drop(pref);

        let pref = Preference::new(JsonFileStore::open(&path));
        assert!(pref.get(), "value persists across open");
    }

    #[test]
    fn test_json_file_store_malformed_file_degrades_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json at all").expect("write");

        let store = JsonFileStore::open(&path);
        assert!(store.get(HIDE_KANJI_KEY).is_none());
        assert!(!Preference::new(store).get());
    }

    #[test]
    fn test_json_file_store_ignores_non_string_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"hideKanjiEnabled": true, "other": "x"}"#).expect("write");

        let store = JsonFileStore::open(&path);
        assert!(store.get(HIDE_KANJI_KEY).is_none(), "non-string value dropped");
        assert_eq!(store.get("other").as_deref(), Some("x"));
    }
}
