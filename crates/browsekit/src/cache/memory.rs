//! In-process cache store

use super::{CacheEntry, CacheKey, CacheStats, CacheStore, RECENT_URLS};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache kept in a map for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(&key.to_string()).cloned())
    }

    fn put(
        &self,
        key: &CacheKey,
        raw: &str,
        rendered: &str,
        timestamp: i64,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(
            key.to_string(),
            CacheEntry {
                url: key.url.clone(),
                raw: raw.to_string(),
                rendered: rendered.to_string(),
                timestamp,
            },
        );
        Ok(())
    }

    fn entries(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        let mut all: Vec<CacheEntry> = entries.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.url.cmp(&b.url)));
        Ok(all)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn stats(&self) -> Result<CacheStats, StoreError> {
        let all = self.entries()?;
        Ok(CacheStats {
            count: all.len(),
            total_size: all
                .iter()
                .map(|e| (e.raw.len() + e.rendered.len()) as u64)
                .sum(),
            oldest: all.iter().map(|e| e.timestamp).min(),
            newest: all.iter().map(|e| e.timestamp).max(),
            recent_urls: all.iter().take(RECENT_URLS).map(|e| e.url.clone()).collect(),
        })
    }

    fn location(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentPriority;

    fn key(url: &str, nav: bool) -> CacheKey {
        CacheKey::new(url, true, nav, ContentPriority::Auto)
    }

    #[test]
    fn test_put_get_overwrite() {
        let store = MemoryStore::new();
        assert!(store.get(&key("https://a.dev/", false)).unwrap().is_none());

        store.put(&key("https://a.dev/", false), "<p>1</p>", "one", 10).unwrap();
        store.put(&key("https://a.dev/", false), "<p>2</p>", "two", 20).unwrap();

        let entry = store.get(&key("https://a.dev/", false)).unwrap().unwrap();
        assert_eq!(entry.rendered, "two");
        assert_eq!(entry.timestamp, 20);
        assert!(store.get(&key("https://a.dev/", true)).unwrap().is_none());
    }

    #[test]
    fn test_stats_and_clear() {
        let store = MemoryStore::new();
        store.put(&key("https://a.dev/", false), "ab", "cd", 100).unwrap();
        store.put(&key("https://b.dev/", false), "e", "f", 300).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_size, 6);
        assert_eq!(stats.oldest, Some(100));
        assert_eq!(stats.newest, Some(300));
        assert_eq!(stats.recent_urls, vec!["https://b.dev/", "https://a.dev/"]);

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.stats().unwrap(), CacheStats::default());
    }
}
