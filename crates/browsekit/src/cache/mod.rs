//! Rendered page cache
//!
//! Entries are keyed by the normalized URL plus every flag that changes the
//! rendering, so a page browsed with navigation and without it are two
//! separate entries. Entries never expire; only [`CacheStore::clear`]
//! removes them.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::types::ContentPriority;
use std::fmt;

/// Number of URLs reported in [`CacheStats::recent_urls`]
pub const RECENT_URLS: usize = 10;

/// Identity of a cached rendering
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub url: String,
    pub prefer_raw: bool,
    pub include_navigation: bool,
    pub priority: ContentPriority,
}

impl CacheKey {
    /// `url` should already be normalized
    pub fn new(
        url: impl Into<String>,
        prefer_raw: bool,
        include_navigation: bool,
        priority: ContentPriority,
    ) -> Self {
        Self {
            url: url.into(),
            prefer_raw,
            include_navigation,
            priority,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.url,
            u8::from(self.prefer_raw),
            u8::from(self.include_navigation),
            self.priority
        )
    }
}

/// A cached page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    /// Markup as fetched
    pub raw: String,
    /// Final markdown, title and navigation included
    pub rendered: String,
    /// Unix seconds
    pub timestamp: i64,
}

/// Aggregate numbers about a store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub count: usize,
    /// Bytes of raw plus rendered content
    pub total_size: u64,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
    /// Newest first
    pub recent_urls: Vec<String>,
}

/// Storage behind the browse cache
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Insert or overwrite the entry for `key`
    fn put(
        &self,
        key: &CacheKey,
        raw: &str,
        rendered: &str,
        timestamp: i64,
    ) -> Result<(), StoreError>;

    /// Every entry, newest first
    fn entries(&self) -> Result<Vec<CacheEntry>, StoreError>;

    /// Remove everything, returning the number of removed entries
    fn clear(&self) -> Result<usize, StoreError>;

    fn stats(&self) -> Result<CacheStats, StoreError>;

    /// Human readable location, such as a database path
    fn location(&self) -> String;
}
