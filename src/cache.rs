//! In-memory TTL cache keyed by canonical citation
//!
//! Expired entries are treated as absent on lookup and dropped. When the
//! cache is full the oldest entry is evicted to make room. Concurrent writers
//! to one key race; the last write wins.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<V> {
    inserted_at: Instant,
    value: V,
}

pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Live value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let live = entries
            .get(key)
            .map(|entry| now.duration_since(entry.inserted_at) < self.ttl)?;
        if live {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                inserted_at: now,
                value,
            },
        );
    }

    /// Number of stored entries, expired ones included until next access
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(3600), 10);
        cache.insert("Cass. crim. n° 2281234".to_string(), 1).await;

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(cache.get("Cass. crim. n° 2281234").await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("Cass. crim. n° 2281234").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert("k".to_string(), "first").await;
        cache.insert("k".to_string(), "second").await;
        assert_eq!(cache.get("k").await, Some("second"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), 1).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("b".to_string(), 2).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.insert("c".to_string(), 3).await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(2));
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = TtlCache::new(Duration::from_secs(60), 10);
        cache.insert("k".to_string(), 1).await;
        cache.clear().await;
        assert_eq!(cache.get("k").await, None);
    }
}
