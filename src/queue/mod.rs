//! URL frontier queue
//!
//! This module manages the crawl frontier:
//! - Priority-ordered admission with binary-search insertion
//! - Dedup against visited/pending sets keyed by normalized URL
//! - Retry-with-backoff requeueing with priority decay
//! - Serializable state for checkpointing

mod priority;

pub use priority::{calculate_priority, classify_page_type};

use crate::url::{is_crawlable, normalize_url};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum times one item may be requeued after a processing failure
const MAX_RETRIES_PER_ITEM: u32 = 3;

/// Priority penalty applied on each retry
const RETRY_PRIORITY_DECAY: i32 = 10;

/// Coarse page classification carried with each queued URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    List,
    Detail,
    Search,
    Other,
}

/// A URL queued for crawling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Normalized URL (no fragment, no trailing slash except root)
    pub url: String,

    /// Hops from an entry URL
    pub depth: u32,

    /// Higher is dequeued sooner
    pub priority: i32,

    /// The page this URL was discovered on
    pub source_url: Option<String>,

    /// Coarse classification from the link's lexical signals
    pub page_type: PageType,

    /// Times this item has been requeued after a failure
    pub retry_count: u32,

    /// When the item was admitted
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    /// Creates an item with a freshly normalized URL; the caller's URL may
    /// still carry a fragment or trailing slash.
    pub fn new(url: &str, depth: u32, priority: i32, page_type: PageType) -> Option<Self> {
        let normalized = normalize_url(url).ok()?;
        Some(Self {
            url: normalized,
            depth,
            priority,
            source_url: None,
            page_type,
            retry_count: 0,
            added_at: Utc::now(),
        })
    }

    pub fn with_source(mut self, source_url: &str) -> Self {
        self.source_url = Some(source_url.to_string());
        self
    }
}

/// Serializable snapshot of the queue for checkpointing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub visited_urls: Vec<String>,
    pub queued_items: Vec<QueueItem>,
}

/// Queue counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub visited: usize,
}

/// Priority frontier with visited/pending dedup
///
/// Items are kept in a descending-priority Vec; `enqueue` inserts by binary
/// search (equal priorities keep FIFO order), `dequeue` pops the head.
/// A URL is never simultaneously visited and pending; a URL already in
/// either set is silently dropped on re-enqueue.
#[derive(Debug, Default)]
pub struct UrlQueue {
    items: Vec<QueueItem>,
    pending: HashSet<String>,
    visited: HashSet<String>,
}

impl UrlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits an item into the frontier
    ///
    /// Returns false (no-op) when the URL is already visited or pending,
    /// matches an exclusion rule (keyword, extension, scheme), or cannot
    /// be normalized.
    pub fn enqueue(&mut self, item: QueueItem) -> bool {
        let url = match normalize_url(&item.url) {
            Ok(u) => u,
            Err(_) => return false,
        };

        if !is_crawlable(&url) {
            return false;
        }

        if self.visited.contains(&url) || self.pending.contains(&url) {
            return false;
        }

        let mut item = item;
        item.url = url.clone();

        // All existing items with priority >= the new one stay ahead of it,
        // preserving FIFO order among equal priorities.
        let idx = self
            .items
            .partition_point(|existing| existing.priority >= item.priority);
        self.items.insert(idx, item);
        self.pending.insert(url);
        true
    }

    /// Pops the highest-priority item and clears its pending mark
    pub fn dequeue(&mut self) -> Option<QueueItem> {
        if self.items.is_empty() {
            return None;
        }
        let item = self.items.remove(0);
        self.pending.remove(&item.url);
        Some(item)
    }

    /// Requeues a failed item, at most 3 times per item
    ///
    /// Each retry drops the priority by 10 and appends at the tail rather
    /// than re-sorting; imprecise ordering on retry is accepted.
    pub fn requeue_for_retry(&mut self, mut item: QueueItem) -> bool {
        if item.retry_count >= MAX_RETRIES_PER_ITEM {
            return false;
        }
        if self.visited.contains(&item.url) || self.pending.contains(&item.url) {
            return false;
        }
        item.retry_count += 1;
        item.priority -= RETRY_PRIORITY_DECAY;
        self.pending.insert(item.url.clone());
        self.items.push(item);
        true
    }

    /// Marks a URL as completed; it will never be admitted again
    pub fn mark_visited(&mut self, url: &str) {
        if let Ok(normalized) = normalize_url(url) {
            self.pending.remove(&normalized);
            self.visited.insert(normalized);
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        match normalize_url(url) {
            Ok(normalized) => self.visited.contains(&normalized),
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.len(),
            visited: self.visited.len(),
        }
    }

    /// Exports the full queue state for checkpointing
    pub fn export(&self) -> QueueSnapshot {
        QueueSnapshot {
            visited_urls: self.visited.iter().cloned().collect(),
            queued_items: self.items.clone(),
        }
    }

    /// Restores a queue from a snapshot
    ///
    /// Items are re-sorted by priority since serialized order is not
    /// guaranteed; the sort is stable so equal priorities keep their
    /// serialized order.
    pub fn import(snapshot: QueueSnapshot) -> Self {
        let mut items = snapshot.queued_items;
        items.sort_by(|a, b| b.priority.cmp(&a.priority));

        let pending = items.iter().map(|i| i.url.clone()).collect();
        let visited = snapshot.visited_urls.into_iter().collect();

        Self {
            items,
            pending,
            visited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, priority: i32) -> QueueItem {
        QueueItem::new(url, 0, priority, PageType::Other).unwrap()
    }

    #[test]
    fn test_enqueue_dequeue() {
        let mut queue = UrlQueue::new();
        assert!(queue.enqueue(item("https://example.go.jp/a", 50)));
        assert_eq!(queue.len(), 1);

        let dequeued = queue.dequeue().unwrap();
        assert_eq!(dequeued.url, "https://example.go.jp/a");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_priority_ordering() {
        let mut queue = UrlQueue::new();
        queue.enqueue(item("https://example.go.jp/low", 20));
        queue.enqueue(item("https://example.go.jp/high", 100));
        queue.enqueue(item("https://example.go.jp/mid", 60));

        assert_eq!(queue.dequeue().unwrap().priority, 100);
        assert_eq!(queue.dequeue().unwrap().priority, 60);
        assert_eq!(queue.dequeue().unwrap().priority, 20);
    }

    #[test]
    fn test_fifo_among_equal_priorities() {
        let mut queue = UrlQueue::new();
        queue.enqueue(item("https://example.go.jp/first", 50));
        queue.enqueue(item("https://example.go.jp/second", 50));
        queue.enqueue(item("https://example.go.jp/third", 50));

        assert_eq!(queue.dequeue().unwrap().url, "https://example.go.jp/first");
        assert_eq!(queue.dequeue().unwrap().url, "https://example.go.jp/second");
        assert_eq!(queue.dequeue().unwrap().url, "https://example.go.jp/third");
    }

    #[test]
    fn test_dedup_by_normalized_identity() {
        let mut queue = UrlQueue::new();
        assert!(queue.enqueue(item("https://example.go.jp/page", 50)));
        // Same entity: fragment and trailing slash are stripped
        assert!(!queue.enqueue(item("https://example.go.jp/page/", 50)));
        assert!(!queue.enqueue(item("https://example.go.jp/page#section", 50)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_visited_urls_not_readmitted() {
        let mut queue = UrlQueue::new();
        queue.enqueue(item("https://example.go.jp/page", 50));
        queue.dequeue().unwrap();
        queue.mark_visited("https://example.go.jp/page");

        assert!(!queue.enqueue(item("https://example.go.jp/page", 50)));
        assert!(queue.is_visited("https://example.go.jp/page/"));
    }

    #[test]
    fn test_pending_blocks_second_enqueue_until_dequeued() {
        let mut queue = UrlQueue::new();
        assert!(queue.enqueue(item("https://example.go.jp/page", 50)));
        assert!(!queue.enqueue(item("https://example.go.jp/page", 90)));

        let dequeued = queue.dequeue().unwrap();
        // Not yet visited: re-admission is allowed again
        assert!(queue.enqueue(item(&dequeued.url, 50)));
    }

    #[test]
    fn test_excluded_urls_rejected() {
        let mut queue = UrlQueue::new();
        assert!(!queue.enqueue(item("https://example.go.jp/login", 50)));
        assert!(!queue.enqueue(item("https://example.go.jp/doc.pdf", 50)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_non_crawlable_scheme_rejected() {
        let mut queue = UrlQueue::new();
        let bad = QueueItem {
            url: "javascript:void(0)".to_string(),
            depth: 0,
            priority: 50,
            source_url: None,
            page_type: PageType::Other,
            retry_count: 0,
            added_at: Utc::now(),
        };
        assert!(!queue.enqueue(bad));
    }

    #[test]
    fn test_retry_exhaustion() {
        let mut queue = UrlQueue::new();
        queue.enqueue(item("https://example.go.jp/flaky", 50));
        let mut current = queue.dequeue().unwrap();

        for attempt in 1..=3 {
            assert!(queue.requeue_for_retry(current.clone()));
            current = queue.dequeue().unwrap();
            assert_eq!(current.retry_count, attempt);
            assert_eq!(current.priority, 50 - 10 * attempt as i32);
        }

        // Fourth attempt is refused
        assert!(!queue.requeue_for_retry(current));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut queue = UrlQueue::new();
        queue.enqueue(item("https://example.go.jp/a", 80));
        queue.enqueue(item("https://example.go.jp/b", 20));
        queue.enqueue(item("https://example.go.jp/c", 50));
        queue.dequeue().unwrap();
        queue.mark_visited("https://example.go.jp/a");

        let snapshot = queue.export();
        let mut restored = UrlQueue::import(snapshot);

        assert_eq!(restored.stats(), queue.stats());
        assert!(restored.is_visited("https://example.go.jp/a"));
        assert!(!restored.enqueue(item("https://example.go.jp/b", 90)));

        let mut restored = restored;
        assert_eq!(restored.dequeue().unwrap().url, "https://example.go.jp/c");
        assert_eq!(restored.dequeue().unwrap().url, "https://example.go.jp/b");
    }

    #[test]
    fn test_import_resorts_by_priority() {
        let snapshot = QueueSnapshot {
            visited_urls: vec![],
            queued_items: vec![
                item("https://example.go.jp/low", 20),
                item("https://example.go.jp/high", 100),
            ],
        };
        let mut queue = UrlQueue::import(snapshot);
        assert_eq!(queue.dequeue().unwrap().priority, 100);
    }
}
