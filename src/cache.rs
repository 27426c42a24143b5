//! Bounded cache with optional TTL and max-size eviction.
//!
//! One abstraction serves both consumers: outbox snapshots (short TTL, the
//! reconciler's grouping optimization) and bridge classifications (no TTL;
//! a deployed contract's backing bridge never changes, so entries live for
//! the process lifetime unless explicitly invalidated).

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    map: HashMap<K, (V, Instant)>,
    max_size: usize,
    ttl: Option<Duration>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Cache whose entries expire after `ttl`
    pub fn with_ttl(max_size: usize, ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            max_size,
            ttl: Some(ttl),
        }
    }

    /// Cache whose entries never expire (explicit invalidation only)
    pub fn pinned(max_size: usize) -> Self {
        Self {
            map: HashMap::new(),
            max_size,
            ttl: None,
        }
    }

    fn is_live(&self, inserted: Instant) -> bool {
        match self.ttl {
            Some(ttl) => inserted.elapsed() < ttl,
            None => true,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.map
            .get(key)
            .filter(|(_, t)| self.is_live(*t))
            .map(|(v, _)| v.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.get(key).is_some_and(|(_, t)| self.is_live(*t))
    }

    /// Insert, evicting expired entries first and then the oldest entries
    /// while over capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(ttl) = self.ttl {
            let now = Instant::now();
            self.map.retain(|_, (_, t)| now.duration_since(*t) < ttl);
        }
        while self.map.len() >= self.max_size && !self.map.is_empty() {
            let oldest = self
                .map
                .iter()
                .min_by_key(|(_, (_, t))| *t)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                self.map.remove(&k);
            } else {
                break;
            }
        }
        self.map.insert(key, (value, Instant::now()));
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(v, _)| v)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
