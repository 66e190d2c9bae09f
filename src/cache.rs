use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use lru::LruCache;
use parking_lot::Mutex;

/// Read-through cache used by the snapshot context builder.
pub trait CachePort<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn set(&self, key: K, value: V, ttl: Duration);
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl<K, V> CachePort<K, V> for NoCache {
    fn get(&self, _key: &K) -> Option<V> {
        None
    }

    fn set(&self, _key: K, _value: V, _ttl: Duration) {}
}

/// Bounded in-process cache with per entry expiry.
pub struct MemoryCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, (Instant, V)>>,
}

impl<K: Hash + Eq, V> MemoryCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> CachePort<K, V> for MemoryCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => return Some(value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn set(&self, key: K, value: V, ttl: Duration) {
        let expires = Instant::now() + ttl;
        self.entries.lock().put(key, (expires, value));
    }
}
