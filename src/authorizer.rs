// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Gate
//!
//! Turns a gateway REQUEST authorizer event into an Allow decision carrying a
//! fresh access token.
//!
//! ## Flow
//!
//! 1. Parse the event into an [`AuthorizationRequest`]
//! 2. Issue a token
//! 3. Record it in the token cache (failure only clears `cached`)
//! 4. Build the Allow policy with the token context
//!
//! ## Outcomes
//!
//! Every call ends in one of two [`GateOutcome`]s:
//!
//! - `Granted`: the flow above completed
//! - `Fallback`: the event could not be used. A second token is issued
//!   without caching, `requestId` is [`FALLBACK_REQUEST_ID`], and the
//!   resource is the event's `methodArn` if readable, else `*`
//!
//! Both outcomes allow the request. Event contents are never logged.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::cache::{CacheOutcome, TokenCache};
use crate::models::{AuthorizationDecision, AuthorizationRequest, AuthorizerContext, AuthorizerEvent, Effect};
use crate::policy::build_policy;
use crate::token::{IssuedToken, TokenGenerator};

/// Principal reported for every decision.
pub const PRINCIPAL_ID: &str = "user";

/// `requestId` placed in the context on the fallback path.
pub const FALLBACK_REQUEST_ID: &str = "error-fallback";

/// Resource used when the event does not name one.
pub const WILDCARD_RESOURCE: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("event body is not valid JSON: {0}")]
    UnreadableEvent(#[source] serde_json::Error),

    #[error("event is malformed: {source}")]
    MalformedEvent {
        #[source]
        source: serde_json::Error,
        resource: Option<String>,
    },

    #[error("event has an empty methodArn")]
    EmptyResource,
}

impl GateError {
    /// Resource to grant on the fallback path.
    pub fn fallback_resource(&self) -> &str {
        match self {
            GateError::MalformedEvent {
                resource: Some(resource),
                ..
            } => resource,
            _ => WILDCARD_RESOURCE,
        }
    }
}

/// Terminal outcome of one gate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Granted(AuthorizationDecision),
    Fallback(AuthorizationDecision),
}

impl GateOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, GateOutcome::Fallback(_))
    }

    pub fn decision(&self) -> &AuthorizationDecision {
        match self {
            GateOutcome::Granted(decision) | GateOutcome::Fallback(decision) => decision,
        }
    }

    pub fn into_decision(self) -> AuthorizationDecision {
        match self {
            GateOutcome::Granted(decision) | GateOutcome::Fallback(decision) => decision,
        }
    }
}

/// The authorization gate. Cheap to clone; shared by all requests.
#[derive(Clone)]
pub struct Authorizer {
    tokens: Arc<TokenGenerator>,
    cache: TokenCache,
}

impl Authorizer {
    pub fn new(tokens: TokenGenerator, cache: TokenCache) -> Self {
        Self {
            tokens: Arc::new(tokens),
            cache,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Decide on a raw event body.
    pub async fn evaluate(&self, body: &[u8]) -> GateOutcome {
        match parse_event(body) {
            Ok(request) => GateOutcome::Granted(self.authorize(request).await),
            Err(e) => {
                // The event carries caller credentials; never log its contents.
                let resource = e.fallback_resource();
                error!(
                    error = %e,
                    resource = %resource,
                    body_len = body.len(),
                    "Authorizer error, falling back to allow"
                );
                GateOutcome::Fallback(self.fallback(resource))
            }
        }
    }

    /// Allow `request` and attach a freshly cached token.
    pub async fn authorize(&self, request: AuthorizationRequest) -> AuthorizationDecision {
        info!(
            request_id = %request.correlation_id,
            host = %request.host(),
            "Authorizing request"
        );

        let token = IssuedToken::new(self.tokens.issue(), request.host());
        let CacheOutcome { success: cached } = self.cache.store(&token).await;

        let context = AuthorizerContext {
            access_token: token.token.into(),
            user_id: PRINCIPAL_ID.to_string(),
            timestamp: decision_timestamp(),
            request_id: request.correlation_id,
            cached,
        };
        let decision = build_policy(PRINCIPAL_ID, Effect::Allow, &request.resource, Some(context));

        debug!(resource = %request.resource, cached, "Request allowed");
        decision
    }

    /// Allow `resource` with an uncached token.
    fn fallback(&self, resource: &str) -> AuthorizationDecision {
        let context = AuthorizerContext {
            access_token: self.tokens.issue().into(),
            user_id: PRINCIPAL_ID.to_string(),
            timestamp: decision_timestamp(),
            request_id: FALLBACK_REQUEST_ID.to_string(),
            cached: false,
        };
        build_policy(PRINCIPAL_ID, Effect::Allow, resource, Some(context))
    }
}

fn parse_event(body: &[u8]) -> Result<AuthorizationRequest, GateError> {
    let raw: Value = serde_json::from_slice(body).map_err(GateError::UnreadableEvent)?;
    let resource_hint = raw
        .get("methodArn")
        .and_then(Value::as_str)
        .filter(|arn| !arn.is_empty())
        .map(str::to_owned);

    let event: AuthorizerEvent =
        serde_json::from_value(raw).map_err(|source| GateError::MalformedEvent {
            source,
            resource: resource_hint,
        })?;
    if event.method_arn.is_empty() {
        return Err(GateError::EmptyResource);
    }
    Ok(event.into())
}

fn decision_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
