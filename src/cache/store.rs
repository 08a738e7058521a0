//! In-process cache backend.
//!
//! Bounded LRU with per-entry expiry. Expired entries are dropped lazily on read and when a
//! pattern sweep walks past them.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use tokio::time::Instant;

use super::gateway::{CacheError, CacheGateway};
use super::keys::glob_matches;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Live and not-yet-collected expired entries.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn keys(&self) -> Vec<String> {
        rw_read(&self.entries, SOURCE, "keys")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let lookup = entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));
        match lookup {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                entries.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_pattern");
        let doomed: Vec<(String, bool)> = entries
            .iter()
            .filter(|(key, entry)| entry.is_expired(now) || glob_matches(pattern, key))
            .map(|(key, entry)| (key.clone(), !entry.is_expired(now)))
            .collect();

        let mut removed = 0;
        for (key, live) in doomed {
            entries.pop(&key);
            if live {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> MemoryCache {
        MemoryCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = cache(8);
        cache.set("k", "v".into(), MINUTE).await.expect("set");
        assert_eq!(cache.get("k").await.expect("get").as_deref(), Some("v"));

        tokio::time::advance(MINUTE).await;
        assert_eq!(cache.get("k").await.expect("get"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let cache = cache(2);
        cache.set("a", "1".into(), MINUTE).await.expect("set");
        cache.set("b", "2".into(), MINUTE).await.expect("set");
        cache.get("a").await.expect("touch a");
        cache.set("c", "3".into(), MINUTE).await.expect("set");

        assert!(cache.get("a").await.expect("get").is_some());
        assert!(cache.get("b").await.expect("get").is_none());
        assert!(cache.get("c").await.expect("get").is_some());
    }

    #[tokio::test]
    async fn pattern_delete_removes_only_matches() {
        let cache = cache(16);
        for key in [
            "blog_post:list:7:{\"limit\":10}",
            "blog_post:list:7:{\"limit\":20}",
            "blog_post:list:8:{\"limit\":10}",
            "blog_post:7:1",
        ] {
            cache.set(key, "x".into(), MINUTE).await.expect("set");
        }

        let removed = cache
            .delete_by_pattern("blog_post:list:7:*")
            .await
            .expect("sweep");
        assert_eq!(removed, 2);

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["blog_post:7:1", "blog_post:list:8:{\"limit\":10}"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = cache(4);
        cache.set("k", "v".into(), MINUTE).await.expect("set");
        cache.delete("k").await.expect("delete");
        cache.delete("k").await.expect("delete again");
        assert!(cache.get("k").await.expect("get").is_none());
    }
}
