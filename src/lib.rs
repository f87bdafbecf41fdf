// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request Authorizer - Gateway REQUEST Authorizer Service
//!
//! Allows every incoming gateway request, attaching a freshly issued access
//! token that is recorded in a TTL token cache when the cache is reachable.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `authorizer` - Authorization gate and fallback decision
//! - `cache` - Fail-open token cache (Redis or in-process)
//! - `policy` - IAM-style policy construction
//! - `token` - Access token generation

pub mod api;
pub mod authorizer;
pub mod cache;
pub mod config;
pub mod logging;
pub mod models;
pub mod policy;
pub mod state;
pub mod token;
