// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::authorizer::Authorizer;
use crate::cache::{MemoryTokenStore, TokenCache};
use crate::token::TokenGenerator;

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Authorizer,
}

impl AppState {
    pub fn new(authorizer: Authorizer) -> Self {
        Self { authorizer }
    }
}

impl Default for AppState {
    /// Authorizer backed by an in-process token store.
    fn default() -> Self {
        let cache = TokenCache::new(
            Arc::new(MemoryTokenStore::new(1024)),
            Duration::from_secs(300),
            Duration::from_secs(2),
        );
        Self::new(Authorizer::new(TokenGenerator::new(), cache))
    }
}
