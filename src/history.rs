//! Persistent history of generated schemas.
//!
//! Stored as a single JSON file, newest entry first, capped at
//! [`MAX_ENTRIES`]. Persistence failures are logged and swallowed so a
//! full disk or unreadable file never blocks schema generation.

use crate::error::Error;
use crate::schema::{FieldValues, GeneratedSchema, SchemaType};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Oldest entries are dropped beyond this count
pub const MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub url: String,
    pub schema_type: SchemaType,
    pub schema: GeneratedSchema,
    #[serde(default)]
    pub field_values: FieldValues,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, newest first. A missing or corrupt file reads as an
    /// empty history.
    pub fn list(&self) -> Vec<HistoryEntry> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(e) => {
                ::log::error!("History file {} is corrupt: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.list().into_iter().find(|e| e.id == id)
    }

    /// Records a generated schema at the front of the history and returns
    /// the new entry's id. Never fails: persistence errors degrade to a
    /// logged warning.
    pub fn append(
        &self,
        url: &str,
        schema_type: SchemaType,
        schema: &GeneratedSchema,
        field_values: &FieldValues,
    ) -> String {
        let entry = HistoryEntry {
            id: new_entry_id(),
            url: url.to_string(),
            schema_type,
            schema: schema.clone(),
            field_values: field_values.clone(),
            timestamp: now_millis(),
        };
        let id = entry.id.clone();

        let mut entries = self.list();
        entries.insert(0, entry);
        entries.truncate(MAX_ENTRIES);

        if let Err(e) = self.persist(&entries) {
            ::log::error!("Failed to save history to {}: {}", self.path.display(), e);
        }
        id
    }

    /// Removes one entry; true when something was deleted
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        let mut entries = self.list();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), Error> {
        self.persist(&[])
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Parse(format!("could not serialize history: {}", e)))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Timestamp plus a short random suffix, unique enough for a local file
fn new_entry_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("{}-{}", now_millis(), suffix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_schema(url: &str) -> GeneratedSchema {
        let mut schema = GeneratedSchema::default();
        schema.set("@context", json!("https://schema.org"));
        schema.set("@type", json!("WebPage"));
        schema.set("url", json!(url));
        schema
    }

    fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("history.json"))
    }

    #[test]
    fn test_append_prepends_newest_entry() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store.append(
            "https://example.com/first",
            SchemaType::WebPage,
            &sample_schema("https://example.com/first"),
            &FieldValues::new(),
        );
        let second = store.append(
            "https://example.com/second",
            SchemaType::Article,
            &sample_schema("https://example.com/second"),
            &FieldValues::new(),
        );

        let entries = store.list();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second);
        assert_eq!(entries[0].url, "https://example.com/second");
        assert_eq!(entries[1].url, "https://example.com/first");
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let a = store.append(
            "https://example.com",
            SchemaType::WebPage,
            &sample_schema("https://example.com"),
            &FieldValues::new(),
        );
        let b = store.append(
            "https://example.com",
            SchemaType::WebPage,
            &sample_schema("https://example.com"),
            &FieldValues::new(),
        );
        assert_ne!(a, b);
        assert!(store.get(&a).is_some());
    }

    #[test]
    fn test_capped_at_max_entries() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        for i in 0..(MAX_ENTRIES + 5) {
            store.append(
                &format!("https://example.com/{}", i),
                SchemaType::WebPage,
                &sample_schema("https://example.com"),
                &FieldValues::new(),
            );
        }
        let entries = store.list();
        assert_eq!(entries.len(), MAX_ENTRIES);
        // Newest entry survives, the oldest were dropped
        assert_eq!(
            entries[0].url,
            format!("https://example.com/{}", MAX_ENTRIES + 4)
        );
    }

    #[test]
    fn test_delete_removes_one_entry() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let id = store.append(
            "https://example.com",
            SchemaType::WebPage,
            &sample_schema("https://example.com"),
            &FieldValues::new(),
        );

        assert!(store.delete(&id).unwrap());
        assert!(store.list().is_empty());
        assert!(!store.delete(&id).unwrap());
    }

    #[test]
    fn test_clear_empties_the_store() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        for i in 0..3 {
            store.append(
                &format!("https://example.com/{}", i),
                SchemaType::WebPage,
                &sample_schema("https://example.com"),
                &FieldValues::new(),
            );
        }

        store.clear().unwrap();
        assert!(store.list().is_empty());

        // The store stays usable after a clear
        store.append(
            "https://example.com/after",
            SchemaType::WebPage,
            &sample_schema("https://example.com/after"),
            &FieldValues::new(),
        );
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.list().is_empty());

        // Appending over a corrupt file starts fresh
        store.append(
            "https://example.com",
            SchemaType::WebPage,
            &sample_schema("https://example.com"),
            &FieldValues::new(),
        );
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nope").join("history.json"));
        assert!(store.list().is_empty());
    }
}
