//! Compile result caching with expiry
//!
//! The table is a single JSON object keyed by project id + document id:
//!
//! ```json
//! {"P1D1": {"pdf": "/project/P1/build/abc/output/output.pdf", "expired": 1700000600}}
//! ```

use crate::error::{OlError, OlResult};
use crate::storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mapping from artifact type to retrieval locator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSet(BTreeMap<String, String>);

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a locator; the first locator seen for a type wins
    pub fn insert(&mut self, kind: impl Into<String>, locator: impl Into<String>) {
        self.0.entry(kind.into()).or_insert_with(|| locator.into());
    }

    pub fn get(&self, kind: &str) -> Option<&str> {
        self.0.get(kind).map(String::as_str)
    }

    /// Artifact types, sorted
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OutputSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut outputs = Self::new();
        for (kind, locator) in iter {
            outputs.insert(kind, locator);
        }
        outputs
    }
}

/// A cached compile result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub outputs: OutputSet,

    /// Expiry as unix seconds
    pub expired: i64,
}

impl CacheEntry {
    pub fn new(outputs: OutputSet, expires_at: DateTime<Utc>) -> Self {
        Self {
            outputs,
            expired: expires_at.timestamp(),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.expired
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expired, 0)
    }
}

/// Persistent table of compile results
#[derive(Debug)]
pub struct CompileCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    max_entries: usize,
}

impl CompileCache {
    pub const FILE_NAME: &'static str = "compile-cache.json";

    /// Cache key for a project/document pair
    pub fn key(project_id: &str, document_id: &str) -> String {
        format!("{}{}", project_id, document_id)
    }

    /// Load the table; a missing or unreadable table starts empty
    pub fn load(path: impl Into<PathBuf>, max_entries: usize) -> OlResult<Self> {
        let path = path.into();
        let entries = match storage::read_optional(&path)? {
            None => {
                debug!("No compile cache at {}", path.display());
                BTreeMap::new()
            }
            Some(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Ignoring corrupt compile cache {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
        };

        Ok(Self {
            path,
            entries,
            max_entries,
        })
    }

    /// Load the table from its default location in the state directory
    pub fn open(state_dir: &Path, max_entries: usize) -> OlResult<Self> {
        Self::load(state_dir.join(Self::FILE_NAME), max_entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry for `key`, regardless of freshness
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Entry for `key` if it has not expired at `now`
    pub fn fresh(&self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| entry.is_fresh(now))
    }

    /// Store an entry, overwriting any previous one for the key
    pub fn insert(&mut self, key: impl Into<String>, entry: CacheEntry) {
        let key = key.into();
        self.entries.insert(key.clone(), entry);
        self.enforce_cap(&key);
    }

    /// Drop entries with the earliest expiry until the table fits the cap
    fn enforce_cap(&mut self, keep: &str) {
        if self.max_entries == 0 {
            return;
        }
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != keep)
                .min_by_key(|(_, entry)| entry.expired)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    debug!("Evicting compile cache entry {}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Persist the whole table
    pub fn save(&self) -> OlResult<()> {
        let content = serde_json::to_string_pretty(&self.entries).map_err(OlError::Json)?;
        storage::write_atomic(&self.path, content.as_bytes())
    }

    /// Remove every entry and the backing file
    pub fn clear(&mut self) -> OlResult<usize> {
        let count = self.entries.len();
        self.entries.clear();
        storage::remove_if_exists(&self.path)?;
        Ok(count)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use tempfile::TempDir;

    fn pdf_outputs() -> OutputSet {
        [("pdf", "/p/P1/build/abc.pdf")].into_iter().collect()
    }

    #[test]
    fn entry_serializes_flat() {
        let entry = CacheEntry {
            outputs: pdf_outputs(),
            expired: 1_700_000_600,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"pdf": "/p/P1/build/abc.pdf", "expired": 1_700_000_600})
        );

        let parsed: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn first_locator_per_type_wins() {
        let outputs: OutputSet = [("log", "/a.log"), ("log", "/b.log")].into_iter().collect();
        assert_eq!(outputs.get("log"), Some("/a.log"));
        assert_eq!(outputs.len(), 1);
    }

    #[test]
    fn freshness_is_strict() {
        let now = Utc::now();
        let entry = CacheEntry::new(pdf_outputs(), now);
        assert!(!entry.is_fresh(now));
        assert!(entry.is_fresh(now - Duration::seconds(1)));
    }

    #[test]
    fn key_concatenates_ids() {
        assert_eq!(CompileCache::key("P1", "D1"), "P1D1");
        assert_eq!(CompileCache::key("P1", ""), "P1");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let mut cache = CompileCache::open(temp.path(), 0).unwrap();
        let expires = Utc::now() + Duration::seconds(600);
        cache.insert("P1D1", CacheEntry::new(pdf_outputs(), expires));
        cache.save().unwrap();

        let loaded = CompileCache::open(temp.path(), 0).unwrap();
        let entry = loaded.fresh("P1D1", Utc::now()).unwrap();
        assert_eq!(entry.outputs.get("pdf"), Some("/p/P1/build/abc.pdf"));
        assert_eq!(entry.expired, expires.timestamp());
    }

    #[test]
    fn stale_entries_are_kept_but_not_fresh() {
        let temp = TempDir::new().unwrap();
        let mut cache = CompileCache::open(temp.path(), 0).unwrap();
        cache.insert(
            "P1D1",
            CacheEntry::new(pdf_outputs(), Utc::now() - Duration::seconds(5)),
        );

        assert!(cache.fresh("P1D1", Utc::now()).is_none());
        assert!(cache.get("P1D1").is_some());
    }

    #[test]
    fn corrupt_table_starts_empty() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CompileCache::FILE_NAME), "{\"P1D1\": {\"pdf\"").unwrap();

        let cache = CompileCache::open(temp.path(), 0).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn cap_evicts_earliest_expiry() {
        let temp = TempDir::new().unwrap();
        let mut cache = CompileCache::open(temp.path(), 2).unwrap();
        let now = Utc::now();

        cache.insert("a", CacheEntry::new(pdf_outputs(), now + Duration::seconds(10)));
        cache.insert("b", CacheEntry::new(pdf_outputs(), now + Duration::seconds(20)));
        cache.insert("c", CacheEntry::new(pdf_outputs(), now - Duration::seconds(30)));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn clear_removes_file() {
        let temp = TempDir::new().unwrap();
        let mut cache = CompileCache::open(temp.path(), 0).unwrap();
        cache.insert("k", CacheEntry::new(pdf_outputs(), Utc::now()));
        cache.save().unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(!cache.path().exists());
    }
}
