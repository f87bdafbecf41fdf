// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, extract::State, Json};

use crate::models::{AuthorizationDecision, AuthorizerEvent};
use crate::state::AppState;

/// Authorize a gateway request.
///
/// Always answers 200 with an Allow policy. Bodies that are not a usable
/// event get the fallback decision instead of a client error, so the raw
/// body is taken rather than a `Json` extractor.
#[utoipa::path(
    post,
    path = "/v1/authorize",
    tag = "Authorizer",
    request_body = AuthorizerEvent,
    responses(
        (status = 200, description = "Authorization decision", body = AuthorizationDecision)
    )
)]
pub async fn authorize(State(state): State<AppState>, body: Bytes) -> Json<AuthorizationDecision> {
    Json(state.authorizer.evaluate(&body).await.into_decision())
}
