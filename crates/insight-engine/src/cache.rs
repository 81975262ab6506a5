//! Keyed result cache with time-to-live and explicit invalidation.
//!
//! The cache is the only shared mutable state of the engine. Entries are
//! wrapped in `parking_lot::RwLock` (faster than std): single-key reads and
//! writes are atomic and the last writer wins. Two concurrent identical
//! requests may both compute, but they never corrupt an entry.
//!
//! Expired entries are dropped lazily on lookup or via [`ResultCache::purge_expired`].

use crate::types::QuisResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Arc<QuisResult>,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached result for `key`, if present and younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<QuisResult>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    debug!(key, "Cache hit");
                    return Some(Arc::clone(&entry.result));
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless someone refreshed it in the meantime.
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() >= self.ttl)
        {
            entries.remove(key);
            debug!(key, "Cache entry expired");
        }
        None
    }

    /// Store a result, replacing any previous entry for `key`.
    pub fn insert(&self, key: impl Into<String>, result: Arc<QuisResult>) {
        self.entries.write().insert(
            key.into(),
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every expired entry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuisSummary;

    fn result() -> Arc<QuisResult> {
        Arc::new(QuisResult {
            profiles: Vec::new(),
            basic_insights: Vec::new(),
            exploratory_correlations: Vec::new(),
            deep_insights: Vec::new(),
            question_answers: Vec::new(),
            simpson_paradoxes: Vec::new(),
            summary: QuisSummary::default(),
            generated_at: "2024-01-01T00:00:00Z".to_string(),
            duration_ms: 1,
        })
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ResultCache::default();
        let stored = result();
        cache.insert("sales", Arc::clone(&stored));
        let hit = cache.get("sales").unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = ResultCache::new(Duration::from_millis(0));
        cache.insert("sales", result());
        assert!(cache.get("sales").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ResultCache::default();
        cache.insert("a", result());
        cache.insert("b", result());
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = ResultCache::new(Duration::from_millis(0));
        cache.insert("a", result());
        cache.insert("b", result());
        assert_eq!(cache.purge_expired(), 2);
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = ResultCache::default();
        let first = result();
        let second = result();
        cache.insert("k", Arc::clone(&first));
        cache.insert("k", Arc::clone(&second));
        assert!(Arc::ptr_eq(&cache.get("k").unwrap(), &second));
    }
}
