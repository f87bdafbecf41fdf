// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Token Issuance
//!
//! Tokens are opaque strings of the form:
//!
//! ```text
//! temp-token-{millis}-{suffix}
//! ```
//!
//! - `millis`: wall-clock milliseconds since the Unix epoch, never smaller
//!   than the value used for the previous token from the same generator
//! - `suffix`: 64 bits rendered as 16 lowercase hex digits, read from the OS
//!   entropy source
//!
//! If the entropy source fails, the suffix is taken from an in-process
//! counter instead. Issuance itself never fails.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Prefix shared by every issued token.
pub const TOKEN_PREFIX: &str = "temp-token-";

/// Number of hex digits in the random suffix.
const SUFFIX_HEX_LEN: usize = 16;

/// Fills a buffer with random bytes.
pub type EntropySource = fn(&mut [u8]) -> Result<(), rand::Error>;

fn os_entropy(buf: &mut [u8]) -> Result<(), rand::Error> {
    OsRng.try_fill_bytes(buf)
}

/// An issued access token value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenValue(String);

impl TokenValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Millisecond component of the token, if the value is well formed.
    pub fn issued_millis(&self) -> Option<u64> {
        parse_token(&self.0).map(|(millis, _)| millis)
    }

    /// Whether `raw` has the shape produced by [`TokenGenerator::issue`].
    pub fn is_well_formed(raw: &str) -> bool {
        parse_token(raw).is_some()
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TokenValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TokenValue> for String {
    fn from(value: TokenValue) -> Self {
        value.0
    }
}

fn parse_token(raw: &str) -> Option<(u64, &str)> {
    let rest = raw.strip_prefix(TOKEN_PREFIX)?;
    let (millis, suffix) = rest.split_once('-')?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if suffix.len() != SUFFIX_HEX_LEN
        || !suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return None;
    }
    Some((millis.parse().ok()?, suffix))
}

/// Generates unique, time-ordered access tokens.
///
/// One generator is shared by all requests; its only state is the last
/// millisecond value handed out and the degraded-mode counter.
pub struct TokenGenerator {
    entropy: EntropySource,
    last_millis: AtomicU64,
    counter: AtomicU64,
    degraded_logged: AtomicBool,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self::with_entropy(os_entropy)
    }

    /// Create a generator reading suffix bytes from `entropy`.
    pub fn with_entropy(entropy: EntropySource) -> Self {
        Self {
            entropy,
            last_millis: AtomicU64::new(0),
            counter: AtomicU64::new(0),
            degraded_logged: AtomicBool::new(false),
        }
    }

    /// Issue a new token.
    pub fn issue(&self) -> TokenValue {
        let millis = self.next_millis();
        let suffix = self.next_suffix();
        TokenValue(format!(
            "{TOKEN_PREFIX}{millis}-{suffix:0width$x}",
            width = SUFFIX_HEX_LEN
        ))
    }

    fn next_millis(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let previous = self.last_millis.fetch_max(now, Ordering::AcqRel);
        previous.max(now)
    }

    fn next_suffix(&self) -> u64 {
        let mut bytes = [0u8; 8];
        match (self.entropy)(&mut bytes) {
            Ok(()) => u64::from_be_bytes(bytes),
            Err(e) => {
                if !self.degraded_logged.swap(true, Ordering::Relaxed) {
                    warn!(error = %e, "Entropy source unavailable, using counter-based token suffix");
                }
                self.counter.fetch_add(1, Ordering::Relaxed)
            }
        }
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A token together with the request data it was issued for.
///
/// Serialized form is the record written to the token cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: TokenValue,
    pub created_at: DateTime<Utc>,
    pub host: String,
    pub valid: bool,
}

impl IssuedToken {
    pub fn new(token: TokenValue, host: impl Into<String>) -> Self {
        Self {
            token,
            created_at: Utc::now(),
            host: host.into(),
            valid: true,
        }
    }
}
