// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. A missing
//! cache credential or an unparseable value is fatal: the process refuses to
//! serve rather than degrade per request.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain, enables HTTPS with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `TOKEN_CACHE_BACKEND` | `redis` or `memory` | `redis` |
//! | `TOKEN_CACHE_URL` | Cache service endpoint | `redis://127.0.0.1:6379` |
//! | `TOKEN_CACHE_AUTH_TOKEN` | Cache service credential | Required for `redis` |
//! | `TOKEN_CACHE_NAMESPACE` | Namespace for token keys | `authorizer-tokens` |
//! | `TOKEN_CACHE_TTL_SECONDS` | Lifetime of a cached token | `300` |
//! | `TOKEN_CACHE_WRITE_TIMEOUT_MS` | Budget for one cache write | `2000` |
//! | `TOKEN_CACHE_MEMORY_CAPACITY` | Max entries for the `memory` backend | `10000` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Selects the token store implementation.
pub const CACHE_BACKEND_ENV: &str = "TOKEN_CACHE_BACKEND";
pub const CACHE_URL_ENV: &str = "TOKEN_CACHE_URL";
/// Credential for the cache service. Never logged.
pub const CACHE_AUTH_TOKEN_ENV: &str = "TOKEN_CACHE_AUTH_TOKEN";
pub const CACHE_NAMESPACE_ENV: &str = "TOKEN_CACHE_NAMESPACE";
pub const CACHE_TTL_ENV: &str = "TOKEN_CACHE_TTL_SECONDS";
pub const CACHE_WRITE_TIMEOUT_ENV: &str = "TOKEN_CACHE_WRITE_TIMEOUT_MS";
pub const CACHE_MEMORY_CAPACITY_ENV: &str = "TOKEN_CACHE_MEMORY_CAPACITY";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CACHE_NAMESPACE: &str = "authorizer-tokens";

/// Default lifetime of a cached token (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default budget for a single cache write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(2000);

pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration missing: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(ConfigError::invalid(LOG_FORMAT_ENV, format!("unknown format '{other}'"))),
        }
    }
}

/// Which token store backs the token cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::invalid(
                CACHE_BACKEND_ENV,
                format!("expected 'redis' or 'memory', got '{other}'"),
            )),
        }
    }
}

/// HTTPS certificate and key locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::invalid(HOST_ENV, format!("{e}")))
    }
}

/// Token cache settings.
#[derive(Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub endpoint: Url,
    pub credential: Option<SecretString>,
    pub namespace: String,
    pub ttl: Duration,
    pub write_timeout: Duration,
    pub memory_capacity: usize,
}

impl CacheConfig {
    /// In-process cache with default limits, for local runs and tests.
    pub fn memory() -> Self {
        Self {
            backend: CacheBackend::Memory,
            endpoint: Url::parse(DEFAULT_CACHE_URL).expect("default cache URL is valid"),
            credential: None,
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            ttl: DEFAULT_CACHE_TTL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }

    /// Endpoint with any embedded password removed, safe to log.
    pub fn redacted_endpoint(&self) -> String {
        let mut endpoint = self.endpoint.clone();
        if endpoint.password().is_some() {
            let _ = endpoint.set_password(None);
        }
        endpoint.to_string()
    }
}

/// Complete process configuration.
#[derive(Debug)]
pub struct AuthorizerConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub log_format: LogFormat,
}

impl AuthorizerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: env_or_default(&lookup, HOST_ENV, DEFAULT_HOST),
            port: env_parsed(&lookup, PORT_ENV)?.unwrap_or(DEFAULT_PORT),
            tls: tls_config(&lookup)?,
        };

        let log_format = env_optional(&lookup, LOG_FORMAT_ENV)
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            server,
            cache: cache_config(&lookup)?,
            log_format,
        })
    }
}

fn tls_config<F>(lookup: &F) -> Result<Option<TlsConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match (
        env_optional(lookup, TLS_CERT_PATH_ENV),
        env_optional(lookup, TLS_KEY_PATH_ENV),
    ) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: cert.into(),
            key_path: key.into(),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
        (None, Some(_)) => Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
    }
}

fn cache_config<F>(lookup: &F) -> Result<CacheConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let backend = env_optional(lookup, CACHE_BACKEND_ENV)
        .map(|v| v.parse::<CacheBackend>())
        .transpose()?
        .unwrap_or(CacheBackend::Redis);

    let raw_endpoint = env_or_default(lookup, CACHE_URL_ENV, DEFAULT_CACHE_URL);
    let endpoint = Url::parse(&raw_endpoint)
        .map_err(|e| ConfigError::invalid(CACHE_URL_ENV, e.to_string()))?;
    if !matches!(endpoint.scheme(), "redis" | "rediss") {
        return Err(ConfigError::invalid(
            CACHE_URL_ENV,
            format!("unsupported scheme '{}'", endpoint.scheme()),
        ));
    }

    let credential = env_optional(lookup, CACHE_AUTH_TOKEN_ENV).map(SecretString::from);
    if backend == CacheBackend::Redis && credential.is_none() {
        return Err(ConfigError::Missing(CACHE_AUTH_TOKEN_ENV));
    }

    let ttl_secs: u64 = env_parsed(lookup, CACHE_TTL_ENV)?.unwrap_or(DEFAULT_CACHE_TTL.as_secs());
    if ttl_secs == 0 {
        return Err(ConfigError::invalid(CACHE_TTL_ENV, "must be greater than zero"));
    }

    let timeout_ms: u64 = env_parsed(lookup, CACHE_WRITE_TIMEOUT_ENV)?
        .unwrap_or(DEFAULT_WRITE_TIMEOUT.as_millis() as u64);
    if timeout_ms == 0 {
        return Err(ConfigError::invalid(
            CACHE_WRITE_TIMEOUT_ENV,
            "must be greater than zero",
        ));
    }

    let memory_capacity: usize =
        env_parsed(lookup, CACHE_MEMORY_CAPACITY_ENV)?.unwrap_or(DEFAULT_MEMORY_CAPACITY);
    if memory_capacity == 0 {
        return Err(ConfigError::invalid(
            CACHE_MEMORY_CAPACITY_ENV,
            "must be greater than zero",
        ));
    }

    Ok(CacheConfig {
        backend,
        endpoint,
        credential,
        namespace: env_or_default(lookup, CACHE_NAMESPACE_ENV, DEFAULT_CACHE_NAMESPACE),
        ttl: Duration::from_secs(ttl_secs),
        write_timeout: Duration::from_millis(timeout_ms),
        memory_capacity,
    })
}

fn env_optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_optional(lookup, name).unwrap_or_else(|| default.to_string())
}

fn env_parsed<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_optional(lookup, name)
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| ConfigError::invalid(name, format!("'{v}': {e}")))
        })
        .transpose()
}
