// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken_aws_lc::jwk::Jwk;
use tracing::debug;

use crate::errors::JwksError;
use crate::traits::KeyCache;

/// How long a cached key stays usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxAge {
    /// Entries never expire
    #[default]
    NoCheck,
    /// Entries expire once they are this old. A zero limit expires every
    /// entry as soon as it is inserted.
    Limit(Duration),
}

impl From<Option<Duration>> for MaxAge {
    fn from(value: Option<Duration>) -> Self {
        match value {
            Some(limit) => MaxAge::Limit(limit),
            None => MaxAge::NoCheck,
        }
    }
}

/// Cache entry for a single JWK
#[derive(Debug, Clone)]
struct CacheEntry {
    key: Jwk,
    inserted_at: Instant,
    /// Monotonic insertion counter, used to pick eviction victims
    seq: u64,
}

fn is_expired(max_age: MaxAge, entry: &CacheEntry) -> bool {
    match max_age {
        MaxAge::NoCheck => false,
        MaxAge::Limit(limit) => entry.inserted_at.elapsed() >= limit,
    }
}

/// In-memory [`KeyCache`] bounded by entry age and entry count.
///
/// Expiry is checked lazily on reads and when the cache overflows; nothing
/// runs in the background. When an insert pushes the cache over
/// `max_size`, expired entries are dropped first and then the entries that
/// were inserted (or refreshed) the longest time ago, until the bound holds
/// again. The key that was just inserted is never evicted.
///
/// Example usage:
///
/// ```
/// use std::time::Duration;
/// use jwks_resolver::cache::{MaxAge, MemoryKeyCache};
///
/// // keep at most 5 keys, each for 10 minutes
/// let cache = MemoryKeyCache::new(MaxAge::Limit(Duration::from_secs(600)), Some(5));
/// assert!(cache.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryKeyCache {
    /// `None` for a disabled cache, which stays empty forever
    entries: Option<HashMap<String, CacheEntry>>,
    max_age: MaxAge,
    /// `None` means unbounded, `Some(0)` disables caching
    max_size: Option<usize>,
    next_seq: u64,
}

impl Default for MemoryKeyCache {
    fn default() -> Self {
        Self::persistent()
    }
}

impl MemoryKeyCache {
    /// Create a new cache with the given limits
    pub fn new(max_age: MaxAge, max_size: Option<usize>) -> Self {
        Self {
            entries: Some(HashMap::new()),
            max_age,
            max_size,
            next_seq: 0,
        }
    }

    /// Cache that keeps every key forever
    pub fn persistent() -> Self {
        Self::new(MaxAge::NoCheck, None)
    }

    /// Cache that never stores anything, so every lookup hits the network
    pub fn disabled() -> Self {
        Self {
            entries: None,
            max_age: MaxAge::NoCheck,
            max_size: Some(0),
            next_seq: 0,
        }
    }

    pub fn max_age(&self) -> MaxAge {
        self.max_age
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry (possibly expired) exists for `key_id`
    pub fn contains(&self, key_id: &str) -> bool {
        self.entries
            .as_ref()
            .is_some_and(|entries| entries.contains_key(key_id))
    }

    fn is_disabled(&self) -> bool {
        self.entries.is_none() || self.max_size == Some(0)
    }

    /// Shrink the cache back to `max_size`, never touching `keep`
    fn handle_overflow(&mut self, keep: &str) {
        let Some(max_size) = self.max_size else {
            return;
        };
        let max_age = self.max_age;
        let Some(entries) = self.entries.as_mut() else {
            return;
        };

        if entries.len() <= max_size {
            return;
        }

        entries.retain(|id, entry| {
            let expired = id != keep && is_expired(max_age, entry);
            if expired {
                debug!(kid = %id, "evicted expired key from cache");
            }
            !expired
        });

        let excess = entries.len().saturating_sub(max_size);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(u64, String)> = entries
            .iter()
            .filter(|(id, _)| id.as_str() != keep)
            .map(|(id, entry)| (entry.seq, id.clone()))
            .collect();
        candidates.sort_unstable();

        for (_, id) in candidates.into_iter().take(excess) {
            entries.remove(&id);
            debug!(kid = %id, "evicted key from cache");
        }
    }
}

impl KeyCache for MemoryKeyCache {
    fn get(&self, key_id: &str) -> Result<Jwk, JwksError> {
        let entry = self
            .entries
            .as_ref()
            .and_then(|entries| entries.get(key_id))
            .ok_or(JwksError::KeyNotFound)?;

        if is_expired(self.max_age, entry) {
            debug!(kid = %key_id, "cached key is expired");
            return Err(JwksError::KeyExpired);
        }

        Ok(entry.key.clone())
    }

    fn add(&mut self, key_id: &str, keys: &[Jwk]) -> Result<Jwk, JwksError> {
        if self.is_disabled() {
            return Err(JwksError::KeyNotFound);
        }

        let key = keys
            .iter()
            .find(|key| key.common.key_id.as_deref() == Some(key_id))
            .ok_or(JwksError::KeyNotFound)?;

        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(entries) = self.entries.as_mut() {
            entries.insert(
                key_id.to_string(),
                CacheEntry {
                    key: key.clone(),
                    inserted_at: Instant::now(),
                    seq,
                },
            );
        }
        debug!(kid = %key_id, "stored key in cache");

        self.handle_overflow(key_id);

        Ok(key.clone())
    }
}
