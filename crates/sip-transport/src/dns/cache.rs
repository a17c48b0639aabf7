//! TTL-respecting cache over resolved addresses, keyed by the same
//! [`QueryType`] identity used for in-flight deduplication — equality
//! on the typed key, never on a `ToString()`'d representation (spec
//! Open Question §8).

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::dns::inflight::QueryType;

struct CacheEntry {
    addrs: Vec<IpAddr>,
    expires_at: Instant,
}

pub struct ResolverCache {
    entries: DashMap<QueryType, CacheEntry>,
}

impl ResolverCache {
    pub fn new() -> Self {
        ResolverCache { entries: DashMap::new() }
    }

    pub fn get(&self, key: &QueryType) -> Option<Vec<IpAddr>> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.addrs.clone())
    }

    pub fn insert(&self, key: QueryType, addrs: Vec<IpAddr>, min_ttl: Duration) {
        self.entries.insert(key, CacheEntry { addrs, expires_at: Instant::now() + min_ttl });
    }
}

impl Default for ResolverCache {
    fn default() -> Self {
        Self::new()
    }
}
