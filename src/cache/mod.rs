//! Disk-persistable LRU page cache
//!
//! Caches rendered pages keyed by normalized URL. Eviction is pure LRU
//! once capacity is reached; TTL expiry is checked lazily on read rather
//! than swept proactively. The whole cache (entries, access order, hit and
//! miss counters) round-trips through a single JSON file so page content
//! can be reused across crawl runs against the same targets.

use crate::render::RenderedPage;
use crate::url::normalize_url;
use crate::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

/// One cached page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub html: String,
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub cached_at: DateTime<Utc>,
    pub ttl_ms: u64,
    pub size: usize,
}

impl CacheEntry {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at >= ChronoDuration::milliseconds(self.ttl_ms as i64)
    }

    fn into_page(self) -> RenderedPage {
        RenderedPage {
            html: self.html,
            url: self.url,
            status: self.status,
            content_type: self.content_type,
            load_time_ms: 0,
        }
    }
}

/// Hit/miss counters, persisted alongside the entries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// On-disk form of the whole cache
#[derive(Serialize, Deserialize)]
struct PersistedCache {
    entries: Vec<(String, CacheEntry)>,
    /// Keys from least to most recently used
    access_order: Vec<String>,
    stats: CacheStats,
    saved_at: DateTime<Utc>,
}

/// LRU response cache keyed by normalized URL
pub struct ResponseCache {
    entries: LruCache<String, CacheEntry>,
    default_ttl: Duration,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(max_entries.max(1)).expect("max(1) is non-zero"),
            ),
            default_ttl,
            stats: CacheStats::default(),
        }
    }

    /// Looks up a page, refreshing its recency on hit
    ///
    /// An entry whose TTL has elapsed is deleted on this access and
    /// counted as a miss.
    pub fn get(&mut self, url: &str) -> Option<RenderedPage> {
        self.get_at(url, Utc::now())
    }

    fn get_at(&mut self, url: &str, now: DateTime<Utc>) -> Option<RenderedPage> {
        let key = match normalize_url(url) {
            Ok(k) => k,
            Err(_) => return None,
        };

        let expired = match self.entries.get(&key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.pop(&key);
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        self.entries.get(&key).cloned().map(CacheEntry::into_page)
    }

    /// Stores a rendered page under its normalized URL
    pub fn set(&mut self, url: &str, page: &RenderedPage, ttl: Option<Duration>) {
        let key = match normalize_url(url) {
            Ok(k) => k,
            Err(_) => return,
        };
        let ttl = ttl.unwrap_or(self.default_ttl);

        let entry = CacheEntry {
            html: page.html.clone(),
            url: page.url.clone(),
            status: page.status,
            content_type: page.content_type.clone(),
            cached_at: Utc::now(),
            ttl_ms: ttl.as_millis() as u64,
            size: page.html.len(),
        };
        self.entries.put(key, entry);
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the cache and its counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    /// Serializes the entire cache to one JSON file
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // LruCache iterates most-recent first; access_order is stored
        // least-recent first so a replay of put() calls restores recency
        let mut access_order: Vec<String> =
            self.entries.iter().map(|(k, _)| k.clone()).collect();
        access_order.reverse();

        let persisted = PersistedCache {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            access_order,
            stats: self.stats,
            saved_at: Utc::now(),
        };

        let json = serde_json::to_string(&persisted)?;
        std::fs::write(path, json)?;
        tracing::debug!("Persisted {} cache entries to {}", self.entries.len(), path.display());
        Ok(())
    }

    /// Restores a cache from a persisted file
    ///
    /// Entries whose TTL already elapsed by wall clock are silently
    /// discarded.
    pub fn load(path: &Path, max_entries: usize, default_ttl: Duration) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let persisted: PersistedCache = serde_json::from_str(&json)?;
        tracing::debug!(
            "Loading page cache saved at {}",
            persisted.saved_at.format("%Y-%m-%d %H:%M:%S")
        );

        let mut cache = Self::new(max_entries, default_ttl);
        cache.stats = persisted.stats;

        let now = Utc::now();
        let mut by_key: std::collections::HashMap<String, CacheEntry> =
            persisted.entries.into_iter().collect();

        let mut dropped = 0usize;
        for key in persisted.access_order {
            if let Some(entry) = by_key.remove(&key) {
                if entry.is_expired_at(now) {
                    dropped += 1;
                } else {
                    cache.entries.put(key, entry);
                }
            }
        }
        if dropped > 0 {
            tracing::debug!("Dropped {} expired cache entries on load", dropped);
        }

        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, html: &str) -> RenderedPage {
        RenderedPage {
            html: html.to_string(),
            url: url.to_string(),
            status: 200,
            content_type: "text/html".to_string(),
            load_time_ms: 12,
        }
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set("https://example.go.jp/a", &page("https://example.go.jp/a", "hello"), None);

        let hit = cache.get("https://example.go.jp/a").unwrap();
        assert_eq!(hit.html, "hello");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_normalized_key_identity() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set(
            "https://example.go.jp/a/",
            &page("https://example.go.jp/a/", "hello"),
            None,
        );
        // Fragment and trailing slash resolve to the same key
        assert!(cache.get("https://example.go.jp/a#top").is_some());
    }

    #[test]
    fn test_miss_counted() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        assert!(cache.get("https://example.go.jp/nothing").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_ttl_expiry_on_read() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set(
            "https://example.go.jp/a",
            &page("https://example.go.jp/a", "x"),
            Some(Duration::from_millis(1000)),
        );

        // 1100ms later the entry is expired, deleted on access, and a miss
        let later = Utc::now() + ChronoDuration::milliseconds(1100);
        assert!(cache.get_at("https://example.go.jp/a", later).is_none());
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_not_expired_before_ttl() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set(
            "https://example.go.jp/a",
            &page("https://example.go.jp/a", "x"),
            Some(Duration::from_millis(1000)),
        );

        let later = Utc::now() + ChronoDuration::milliseconds(500);
        assert!(cache.get_at("https://example.go.jp/a", later).is_some());
    }

    #[test]
    fn test_lru_eviction_respects_access_order() {
        let mut cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.set("https://example.go.jp/a", &page("https://example.go.jp/a", "a"), None);
        cache.set("https://example.go.jp/b", &page("https://example.go.jp/b", "b"), None);

        // Access A so B becomes least recently used
        cache.get("https://example.go.jp/a");
        cache.set("https://example.go.jp/c", &page("https://example.go.jp/c", "c"), None);

        assert!(cache.get("https://example.go.jp/a").is_some());
        assert!(cache.get("https://example.go.jp/b").is_none());
        assert!(cache.get("https://example.go.jp/c").is_some());
    }

    #[test]
    fn test_clear() {
        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set("https://example.go.jp/a", &page("https://example.go.jp/a", "a"), None);
        cache.get("https://example.go.jp/a");

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_persist_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");

        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set("https://example.go.jp/a", &page("https://example.go.jp/a", "a"), None);
        cache.set("https://example.go.jp/b", &page("https://example.go.jp/b", "b"), None);
        cache.get("https://example.go.jp/a");
        cache.persist(&path).unwrap();

        let mut restored = ResponseCache::load(&path, 10, Duration::from_secs(60)).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.stats().hits, 1);
        assert_eq!(restored.get("https://example.go.jp/b").unwrap().html, "b");
    }

    #[test]
    fn test_load_discards_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");

        let mut cache = ResponseCache::new(10, Duration::from_secs(60));
        cache.set(
            "https://example.go.jp/stale",
            &page("https://example.go.jp/stale", "old"),
            Some(Duration::from_millis(0)),
        );
        cache.set("https://example.go.jp/fresh", &page("https://example.go.jp/fresh", "new"), None);
        cache.persist(&path).unwrap();

        let restored = ResponseCache::load(&path, 10, Duration::from_secs(60)).unwrap();
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_load_restores_recency_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");

        let mut cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.set("https://example.go.jp/a", &page("https://example.go.jp/a", "a"), None);
        cache.set("https://example.go.jp/b", &page("https://example.go.jp/b", "b"), None);
        cache.get("https://example.go.jp/a");
        cache.persist(&path).unwrap();

        let mut restored = ResponseCache::load(&path, 2, Duration::from_secs(60)).unwrap();
        // B was least recently used at persist time, so it evicts first
        restored.set("https://example.go.jp/c", &page("https://example.go.jp/c", "c"), None);
        assert!(restored.get("https://example.go.jp/a").is_some());
        assert!(restored.get("https://example.go.jp/b").is_none());
    }
}
