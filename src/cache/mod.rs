//! Persisted annotations keyed by preset URL.
//!
//! The on-disk format is a JSON array of `{rating, description, tags, sha1,
//! rawPath}` objects, compatible with the `cache-presets.json` files already
//! published on the preset repository branches.

pub mod source;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::util::write_json_pretty;
use source::CacheSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub annotation: Annotation,
    /// Fingerprint of the preset text the annotation was generated from
    #[serde(rename = "sha1")]
    pub fingerprint: String,
    #[serde(rename = "rawPath")]
    pub identifier: String,
}

/// Parse a cache document. Entries that do not have the expected shape are
/// skipped; a document that is not a JSON array is rejected.
pub fn parse_entries(text: &str) -> Result<Vec<CacheEntry>> {
    let value: serde_json::Value = serde_json::from_str(text).context("Cache is not valid JSON")?;
    let serde_json::Value::Array(items) = value else {
        bail!("Cache is not a JSON array");
    };

    let total = items.len();
    let mut store = CacheStore::new(PathBuf::new(), Vec::new());
    for item in items {
        match serde_json::from_value::<CacheEntry>(item) {
            Ok(entry) => store.upsert(entry),
            Err(e) => debug!("Skipping malformed cache entry: {}", e),
        }
    }
    if store.entries.len() < total {
        warn!(
            "Cache contained {} unusable or duplicate entries out of {}",
            total - store.entries.len(),
            total
        );
    }
    Ok(store.entries)
}

/// Working set of cache entries for one run, at most one per identifier.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    entries: Vec<CacheEntry>,
}

impl CacheStore {
    pub fn new(path: PathBuf, entries: Vec<CacheEntry>) -> Self {
        let mut store = Self {
            path,
            entries: Vec::with_capacity(entries.len()),
        };
        for entry in entries {
            store.upsert(entry);
        }
        store
    }

    /// Take entries from the first source that yields them; start empty if
    /// every source fails.
    pub async fn bootstrap(path: PathBuf, sources: &[Box<dyn CacheSource>]) -> Self {
        for source in sources {
            match source.load().await {
                Ok(entries) => {
                    info!(
                        "Loaded {} cached annotations from {}",
                        entries.len(),
                        source.describe()
                    );
                    return Self::new(path, entries);
                }
                Err(e) => warn!("Cache unavailable from {}: {:#}", source.describe(), e),
            }
        }

        warn!("Failed to read cache-presets.json from any source, using empty cache");
        Self::new(path, Vec::new())
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, identifier: &str) -> Option<&CacheEntry> {
        self.entries.iter().find(|e| e.identifier == identifier)
    }

    /// Replace the entry with the same identifier, or append.
    pub fn upsert(&mut self, entry: CacheEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.identifier == entry.identifier)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Drop entries whose identifier is not in `live`. Returns how many were removed.
    pub fn prune(&mut self, live: &HashSet<&str>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| live.contains(e.identifier.as_str()));
        before - self.entries.len()
    }

    /// Overwrite the cache file with the full working set.
    pub fn persist(&self) -> Result<()> {
        write_json_pretty(&self.path, &self.entries)?;
        debug!(
            "Persisted {} cache entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, fingerprint: &str, rating: f64) -> CacheEntry {
        CacheEntry {
            annotation: Annotation {
                rating,
                description: format!("description of {}", id),
                tags: vec!["标签".to_string()],
            },
            fingerprint: fingerprint.to_string(),
            identifier: id.to_string(),
        }
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_value(entry("https://x/a.yml", "abc", 4.5)).unwrap();
        assert_eq!(json["rawPath"], "https://x/a.yml");
        assert_eq!(json["sha1"], "abc");
        assert_eq!(json["rating"], 4.5);
        assert_eq!(json["tags"][0], "标签");
        assert!(json.get("annotation").is_none());
    }

    #[test]
    fn test_upsert_replaces_by_identifier() {
        let mut store = CacheStore::new(PathBuf::from("unused.json"), vec![]);
        store.upsert(entry("a", "f1", 1.0));
        store.upsert(entry("b", "f1", 2.0));
        store.upsert(entry("a", "f2", 3.0));

        assert_eq!(store.len(), 2);
        let a = store.find("a").unwrap();
        assert_eq!(a.fingerprint, "f2");
        assert_eq!(a.annotation.rating, 3.0);
        assert!(store.find("missing").is_none());
    }

    #[test]
    fn test_new_collapses_duplicates_keeping_latest() {
        let store = CacheStore::new(
            PathBuf::from("unused.json"),
            vec![entry("a", "old", 1.0), entry("a", "new", 2.0)],
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.find("a").unwrap().fingerprint, "new");
    }

    #[test]
    fn test_parse_entries_skips_malformed() {
        let text = r#"[
            {"rating": 4, "description": "d", "tags": ["t"], "sha1": "f", "rawPath": "a"},
            {"description": "no rating", "sha1": "f", "rawPath": "b"},
            "garbage"
        ]"#;
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier, "a");
    }

    #[test]
    fn test_parse_entries_accepts_quoted_rating() {
        let text = r#"[
            {"rating": "4.5", "description": "d", "tags": ["t"], "sha1": "f", "rawPath": "a"},
            {"rating": "high", "description": "d", "tags": ["t"], "sha1": "f", "rawPath": "b"}
        ]"#;
        let entries = parse_entries(text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].annotation.rating, 4.5);

        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["rating"], 4.5);
    }

    #[test]
    fn test_parse_entries_rejects_non_array() {
        assert!(parse_entries(r#"{"rawPath": "a"}"#).is_err());
        assert!(parse_entries("not json").is_err());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-presets.json");
        let mut store = CacheStore::new(path.clone(), vec![]);
        store.upsert(entry("a", "f", 4.0));
        store.persist().unwrap();

        let reloaded = parse_entries(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded, store.entries().to_vec());
    }

    #[test]
    fn test_persist_replaces_previous_cache_whole() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache-presets.json");
        let mut store = CacheStore::new(
            path.clone(),
            (0..5).map(|i| entry(&format!("id{}", i), "f", 3.0)).collect(),
        );
        store.persist().unwrap();

        store.prune(&["id0"].into_iter().collect());
        store.persist().unwrap();

        let reloaded = parse_entries(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_prune_removes_unknown_identifiers() {
        let mut store = CacheStore::new(
            PathBuf::from("unused.json"),
            vec![entry("a", "f", 1.0), entry("b", "f", 1.0), entry("c", "f", 1.0)],
        );
        let live: HashSet<&str> = ["a", "c"].into_iter().collect();
        assert_eq!(store.prune(&live), 1);
        assert!(store.find("b").is_none());
        assert_eq!(store.len(), 2);
    }
}
