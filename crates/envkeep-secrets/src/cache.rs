//! Materialized view of the resolved secrets for one project.
//!
//! The cache is a projection of the scope-shadowing rule over the record
//! store: it holds the effective plaintext of every visible key and nothing
//! else. It has no persistence and can be rebuilt from the store at any time.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use envkeep_core::SecretString;

/// Case-insensitive ordering key with the raw key as tiebreaker, so `Foo`
/// and `foo` sit next to each other and the order is still total. Only
/// ASCII letters fold, matching the store's `ORDER BY`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortKey {
    folded: String,
    raw: String,
}

impl SortKey {
    fn new(raw: &str) -> Self {
        Self {
            folded: raw.to_ascii_lowercase(),
            raw: raw.to_string(),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded
            .cmp(&other.folded)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Key to plaintext mapping in stable case-insensitive key order.
#[derive(Debug, Default, Clone)]
pub struct MaterializedCache {
    entries: BTreeMap<SortKey, SecretString>,
}

impl MaterializedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.entries.get(&SortKey::new(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&SortKey::new(key))
    }

    /// Insert or replace the value of `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: SecretString) -> Option<SecretString> {
        self.entries.insert(SortKey::new(key), value)
    }

    /// Remove `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) -> Option<SecretString> {
        self.entries.remove(&SortKey::new(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretString)> {
        self.entries.iter().map(|(k, v)| (k.raw.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.raw.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
