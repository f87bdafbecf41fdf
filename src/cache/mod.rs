// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Token Cache
//!
//! Records issued tokens in a TTL key/value store. The cache is an
//! optimization only: a write that fails, times out, or is not acknowledged
//! is reported as `success = false` and the authorization flow continues.
//!
//! ## Layout
//!
//! ```text
//! key:   {token}                (scoped by the store's namespace)
//! value: {"token": "...", "created_at": "...", "host": "...", "valid": true}
//! ttl:   TOKEN_CACHE_TTL_SECONDS
//! ```
//!
//! ## Backends
//!
//! - [`RedisTokenStore`]: distributed store used in production
//! - [`MemoryTokenStore`]: in-process LRU store for local runs and tests
//!
//! Exactly one write is attempted per token, bounded by the write timeout
//! even when the caller stops waiting.

pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::token::IssuedToken;

pub use memory::MemoryTokenStore;
pub use redis_store::RedisTokenStore;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache service error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache service did not acknowledge write: {0}")]
    Rejected(String),

    #[error("token record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Write `value` under `key`, expiring after `ttl`.
    ///
    /// Returns `Ok` only once the store has acknowledged the write.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), CacheError>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Result of one cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOutcome {
    pub success: bool,
}

impl CacheOutcome {
    pub const STORED: Self = Self { success: true };
    pub const NOT_STORED: Self = Self { success: false };
}

/// Fail-open writer of issued tokens.
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn TokenStore>,
    ttl: Duration,
    write_timeout: Duration,
}

impl TokenCache {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration, write_timeout: Duration) -> Self {
        Self {
            store,
            ttl,
            write_timeout,
        }
    }

    /// Build the store selected by `config`.
    ///
    /// Fails only on configuration problems; the cache service itself is not
    /// contacted until the first write.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let store: Arc<dyn TokenStore> = match config.backend {
            CacheBackend::Redis => Arc::new(RedisTokenStore::open(config)?),
            CacheBackend::Memory => Arc::new(MemoryTokenStore::new(config.memory_capacity)),
        };
        Ok(Self::new(store, config.ttl, config.write_timeout))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Record `token` in the store.
    ///
    /// Never returns an error: serialization failures, store errors,
    /// timeouts, and panics inside the store all yield
    /// [`CacheOutcome::NOT_STORED`].
    pub async fn store(&self, token: &IssuedToken) -> CacheOutcome {
        let payload = match serde_json::to_string(token) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %CacheError::from(e), "Token cache write skipped");
                return CacheOutcome::NOT_STORED;
            }
        };

        let store = Arc::clone(&self.store);
        let key = token.token.to_string();
        let ttl = self.ttl;
        // Deadline runs inside the task and holds after caller cancellation.
        let write = tokio::spawn(tokio::time::timeout(self.write_timeout, async move {
            store.put(&key, payload, ttl).await
        }));

        match write.await {
            Ok(Ok(Ok(()))) => {
                debug!(backend = self.store.backend(), ttl_secs = ttl.as_secs(), "Token cached");
                CacheOutcome::STORED
            }
            Ok(Ok(Err(e))) => {
                warn!(backend = self.store.backend(), error = %e, "Token cache write failed");
                CacheOutcome::NOT_STORED
            }
            Ok(Err(_)) => {
                warn!(
                    backend = self.store.backend(),
                    timeout_ms = self.write_timeout.as_millis() as u64,
                    "Token cache write timed out"
                );
                CacheOutcome::NOT_STORED
            }
            Err(e) => {
                warn!(backend = self.store.backend(), error = %e, "Token cache write aborted");
                CacheOutcome::NOT_STORED
            }
        }
    }

    /// Check store reachability within the write timeout.
    pub async fn ping(&self) -> Result<(), CacheError> {
        match tokio::time::timeout(self.write_timeout, self.store.ping()).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Unavailable("ping timed out".to_string())),
        }
    }
}
