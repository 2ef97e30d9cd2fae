//! Small TTL cache used for hot leaderboard pages.
//! Entries are `(Instant, V)` pairs behind an `RwLock`; expired entries are
//! dropped lazily on access and the whole cache is cleared on writes.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct TtlCache<K, V> {
    ttl: Duration,
    map: RwLock<HashMap<K, (Instant, V)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            map: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns a clone of a live entry. A zero TTL disables the cache.
    pub async fn get(&self, key: &K) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        // Fast path: read lock
        let expired = match self.map.read().await.get(key) {
            Some((ts, val)) if ts.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(val.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            let mut write = self.map.write().await;
            if let Some((ts, _)) = write.get(key)
                && ts.elapsed() >= self.ttl
            {
                write.remove(key);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.map.write().await.insert(key, (Instant::now(), value));
    }

    pub async fn clear(&self) {
        self.map.write().await.clear();
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}
