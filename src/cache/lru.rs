//! Size-bounded strict LRU cache: an ordered mapping keyed by `(cs,
//! attribute, period)` with a caller-supplied per-value cost function and a
//! total byte budget.
//!
//! Evicts LRU while oversized, refuses to admit a value whose own cost
//! exceeds the budget. Backed by the `lru` crate rather than a probabilistic
//! cache, since eviction order here must be deterministic, not approximate.

use lru::LruCache;
use std::hash::Hash;
use std::sync::Mutex;

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    costs: std::collections::HashMap<K, usize>,
    total: usize,
}

/// A size-bounded, strict-LRU cache. Access and mutation are serialized
/// around one exclusive lock, which is sufficient for the expected workload
/// (the cache is mutated from the task-loop thread only).
pub struct Cache<K: Hash + Eq + Clone, V: Clone> {
    inner: Mutex<Inner<K, V>>,
    max_bytes: usize,
}

impl<K: Hash + Eq + Clone, V: Clone> Cache<K, V> {
    pub fn new(max_bytes: usize) -> Self {
        Cache {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                costs: std::collections::HashMap::new(),
                total: 0,
            }),
            max_bytes,
        }
    }

    /// Look up `key`. On hit, marks it most-recently-used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.get(key).cloned()
    }

    /// Insert `key -> value` with cost `cost_fn(&value)`, evicting LRU
    /// entries as needed. Returns `true` if the value was admitted, `false`
    /// if it was too large for the budget (a no-op, not an error).
    pub fn set(&self, key: K, value: V, cost_fn: impl Fn(&V) -> usize) -> bool {
        let cost = cost_fn(&value);
        if cost >= self.max_bytes {
            return false;
        }
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if let Some(prev_cost) = inner.costs.remove(&key) {
            inner.entries.pop(&key);
            inner.total -= prev_cost;
        }

        while inner.total + cost > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((evicted_key, _)) => {
                    if let Some(evicted_cost) = inner.costs.remove(&evicted_key) {
                        inner.total -= evicted_cost;
                    }
                }
                None => break,
            }
        }

        inner.entries.put(key.clone(), value);
        inner.costs.insert(key, cost);
        inner.total += cost;
        true
    }

    /// Current total cost of all admitted entries.
    pub fn size(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn const_cost(n: usize) -> impl Fn(&i32) -> usize {
        move |_| n
    }

    #[test]
    fn budget_never_exceeded() {
        let cache: Cache<&str, i32> = Cache::new(100);
        for (k, v, cost) in [("a", 1, 40), ("b", 2, 40), ("c", 3, 40), ("d", 4, 40)] {
            cache.set(k, v, const_cost(cost));
            assert!(cache.size() <= 100);
        }
    }

    #[test]
    fn lru_eviction_order_is_deterministic() {
        let cache: Cache<&str, i32> = Cache::new(100);
        cache.set("a", 1, const_cost(40));
        cache.set("b", 2, const_cost(40));
        // touch a, making b the least-recently-used
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3, const_cost(40));

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn oversize_value_is_not_admitted() {
        let cache: Cache<&str, i32> = Cache::new(100);
        let admitted = cache.set("big", 1, const_cost(200));
        assert!(!admitted);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get(&"big"), None);
    }

    #[test]
    fn update_does_not_double_count() {
        let cache: Cache<&str, i32> = Cache::new(100);
        cache.set("a", 1, const_cost(40));
        cache.set("a", 2, const_cost(40));
        assert_eq!(cache.size(), 40);
        assert_eq!(cache.get(&"a"), Some(2));
    }
}
