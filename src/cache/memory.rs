// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU token store kept inside the process.
//!
//! Used when `TOKEN_CACHE_BACKEND=memory` and as the cache service stand-in
//! in tests. Entries are dropped once their TTL passes or when capacity is
//! exceeded, whichever comes first.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;

use super::{CacheError, TokenStore};

/// Cached entry: serialized record + expiry deadline.
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process LRU store with per-entry expiry.
pub struct MemoryTokenStore {
    cache: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryTokenStore {
    /// Create a store holding at most `capacity` tokens.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    /// Get the stored value for `key`.
    ///
    /// Returns `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.value.clone());
            }
            // Expired
            cache.pop(key);
        }
        None
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| CacheError::Unavailable("memory store lock poisoned".to_string()))?;
        cache.put(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
