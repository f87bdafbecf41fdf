// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorizer Data Models
//!
//! Wire types exchanged with the API gateway. All response types derive
//! `Serialize` and `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Inbound**: [`AuthorizerEvent`], the REQUEST authorizer payload sent by
//!   the gateway, and [`AuthorizationRequest`], the validated view of it
//! - **Outbound**: [`AuthorizationDecision`], the IAM-style policy returned to
//!   the gateway, with its [`AuthorizerContext`]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Correlation id and host used when the event does not carry one.
pub const UNKNOWN: &str = "unknown";

// =============================================================================
// Inbound Event
// =============================================================================

/// REQUEST authorizer event as delivered by the gateway.
///
/// Only the fields the authorizer reads are modelled; anything else in the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    /// ARN of the API method being invoked.
    pub method_arn: String,
    /// Gateway request context.
    #[serde(default)]
    pub request_context: Option<RequestContext>,
    /// Request headers. The gateway sends `null` when there are none.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

/// Subset of the gateway request context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Gateway-assigned request id.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// The identity of one authorization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Resource being accessed (the method ARN).
    pub resource: String,
    /// Correlation id, [`UNKNOWN`] when the gateway sent none.
    pub correlation_id: String,
    headers: HashMap<String, String>,
}

impl AuthorizationRequest {
    pub fn new(
        resource: impl Into<String>,
        correlation_id: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            correlation_id: correlation_id.into(),
            headers,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Originating host, [`UNKNOWN`] if the `Host` header is absent.
    pub fn host(&self) -> &str {
        self.header("host").unwrap_or(UNKNOWN)
    }
}

impl From<AuthorizerEvent> for AuthorizationRequest {
    fn from(event: AuthorizerEvent) -> Self {
        let correlation_id = event
            .request_context
            .and_then(|ctx| ctx.request_id)
            .unwrap_or_else(|| UNKNOWN.to_string());
        Self::new(
            event.method_arn,
            correlation_id,
            event.headers.unwrap_or_default(),
        )
    }
}

// =============================================================================
// Outbound Decision
// =============================================================================

/// Policy effect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// One statement of a policy document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Always `execute-api:Invoke`.
    pub action: String,
    pub effect: Effect,
    /// Resource the statement governs.
    pub resource: String,
}

/// IAM policy document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

/// Values the gateway forwards to the backend integration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerContext {
    /// Freshly issued access token.
    pub access_token: String,
    /// Principal the decision was made for.
    pub user_id: String,
    /// Decision time, ISO-8601 UTC.
    pub timestamp: String,
    /// Gateway request id, or `error-fallback` on the fallback path.
    pub request_id: String,
    /// Whether the token was recorded in the token cache.
    pub cached: bool,
}

/// Authorization decision returned to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AuthorizerContext>,
}

impl AuthorizationDecision {
    /// Effect of the first statement.
    pub fn effect(&self) -> Option<Effect> {
        self.policy_document.statement.first().map(|s| s.effect)
    }

    /// Resource of the first statement.
    pub fn resource(&self) -> Option<&str> {
        self.policy_document
            .statement
            .first()
            .map(|s| s.resource.as_str())
    }
}
