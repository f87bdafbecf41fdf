// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Redis-backed token store.
//!
//! The client is built once at startup from validated configuration. The
//! connection itself is opened on first use and then shared by all requests
//! through a multiplexed [`ConnectionManager`], which reconnects on its own
//! after transport errors. Each connection attempt is made exactly once with
//! no backoff; if it fails, the write fails and the next write tries again.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo, Value};
use secrecy::ExposeSecret;
use tokio::sync::OnceCell;
use tracing::info;

use super::{CacheError, TokenStore};
use crate::config::CacheConfig;

/// Connection retries. Zero: a refused connection fails the write at once.
const CONNECT_RETRIES: usize = 0;
const BACKOFF_EXPONENT_BASE: u64 = 2;
const BACKOFF_FACTOR_MS: u64 = 100;

/// Token store writing `SET {namespace}:{token} {record} EX {ttl}`.
pub struct RedisTokenStore {
    client: Client,
    namespace: String,
    connection: OnceCell<ConnectionManager>,
}

impl RedisTokenStore {
    /// Build the client from `config`. No network traffic happens here.
    pub fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        let mut info = config.endpoint.as_str().into_connection_info()?;
        if let Some(credential) = &config.credential {
            info.redis.password = Some(credential.expose_secret().to_string());
        }
        let client = Client::open(info)?;

        info!(
            endpoint = %config.redacted_endpoint(),
            namespace = %config.namespace,
            "Redis token store configured"
        );

        Ok(Self {
            client,
            namespace: config.namespace.clone(),
            connection: OnceCell::new(),
        })
    }

    /// Full Redis key for a token.
    fn key(&self, token: &str) -> String {
        format!("{}:{}", self.namespace, token)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new_with_backoff(
                    self.client.clone(),
                    BACKOFF_EXPONENT_BASE,
                    BACKOFF_FACTOR_MS,
                    CONNECT_RETRIES,
                )
                .await?;
                info!("Connected to Redis token store");
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

/// Whether a `SET` reply is the `OK` acknowledgment.
fn is_ok_reply(reply: &Value) -> bool {
    match reply {
        Value::Okay => true,
        Value::Status(status) => status.eq_ignore_ascii_case("OK"),
        _ => false,
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let reply: Value = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        if is_ok_reply(&reply) {
            Ok(())
        } else {
            Err(CacheError::Rejected(format!("{reply:?}")))
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOutcome, TokenCache};
    use crate::config::CacheBackend;
    use crate::token::{IssuedToken, TokenGenerator};
    use std::sync::Arc;
    use secrecy::SecretString;
    use url::Url;

    fn redis_config(url: &str) -> CacheConfig {
        CacheConfig {
            backend: CacheBackend::Redis,
            endpoint: Url::parse(url).unwrap(),
            credential: Some(SecretString::from("cache-secret")),
            namespace: "tokens".to_string(),
            ..CacheConfig::memory()
        }
    }

    #[test]
    fn open_does_not_connect() {
        // Nothing listens on this port; building the client must still succeed.
        let store = RedisTokenStore::open(&redis_config("redis://127.0.0.1:1")).unwrap();
        assert_eq!(store.backend(), "redis");
        assert!(store.connection.get().is_none());
    }

    #[test]
    fn keys_are_namespaced_tokens() {
        let store = RedisTokenStore::open(&redis_config("redis://127.0.0.1:6379")).unwrap();
        assert_eq!(
            store.key("temp-token-1700000000000-0123456789abcdef"),
            "tokens:temp-token-1700000000000-0123456789abcdef"
        );
    }

    #[test]
    fn only_ok_counts_as_acknowledgment() {
        assert!(is_ok_reply(&Value::Okay));
        assert!(is_ok_reply(&Value::Status("OK".to_string())));
        assert!(!is_ok_reply(&Value::Nil));
        assert!(!is_ok_reply(&Value::Status("QUEUED".to_string())));
        assert!(!is_ok_reply(&Value::Int(0)));
    }

    #[tokio::test]
    async fn refused_connection_fails_without_retrying() {
        let store = RedisTokenStore::open(&redis_config("redis://127.0.0.1:1")).unwrap();
        let started = std::time::Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            store.put("temp-token-1-0123456789abcdef", "{}".to_string(), Duration::from_secs(60)),
        )
        .await
        .expect("refused connection must not be retried");

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(store.connection.get().is_none());
    }

    #[tokio::test]
    async fn unreachable_server_is_reported_as_not_stored() {
        let store = RedisTokenStore::open(&redis_config("redis://127.0.0.1:1")).unwrap();
        let cache = TokenCache::new(
            Arc::new(store),
            Duration::from_secs(60),
            Duration::from_millis(200),
        );
        let token = IssuedToken::new(TokenGenerator::new().issue(), "api.example.com");

        assert_eq!(cache.store(&token).await, CacheOutcome::NOT_STORED);
    }
}
