//! In-flight lookup deduplication: concurrent resolutions for the same
//! query share one wire lookup instead of each issuing their own.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};

/// Identity of a DNS query, used both as the in-flight dedup key and
/// the cache key. Deliberately a typed enum compared by derived
/// `PartialEq`/`Hash`, not a formatted string — two semantically
/// identical queries must dedup even if a caller's string formatting
/// differs incidentally (spec Open Question §8).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryType {
    Address(String),
    Srv(String),
    Naptr(String),
}

type Shared<T> = Arc<OnceCell<std::result::Result<T, String>>>;

/// Registry of lookups in flight for one result shape `T`. The
/// resolver keeps one of these per query kind (addresses, SRV
/// candidates, NAPTR's transport pick) rather than a single
/// `Vec<IpAddr>`-shaped map, since those results don't share a type.
pub(crate) struct InFlightRegistry<T> {
    inflight: DashMap<QueryType, Shared<T>>,
}

impl<T: Clone> InFlightRegistry<T> {
    pub fn new() -> Self {
        InFlightRegistry { inflight: DashMap::new() }
    }

    /// Run `lookup` for `key` unless a lookup for the same key is
    /// already in flight, in which case await its result instead.
    pub async fn dedup<F, Fut>(&self, key: QueryType, lookup: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let cell = self.inflight.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone();

        let result = cell
            .get_or_init(|| async { lookup().await.map_err(|e| e.to_string()) })
            .await
            .clone();

        self.inflight.remove(&key);

        result.map_err(|message| Error::Resolution { name: format!("{:?}", key), message })
    }
}

impl<T: Clone> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
