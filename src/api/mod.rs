// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AuthorizationDecision, AuthorizerContext, AuthorizerEvent, Effect, PolicyDocument,
        PolicyStatement, RequestContext,
    },
    state::AppState,
};

pub mod authorize;
pub mod health;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new().route("/authorize", post(authorize::authorize));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        authorize::authorize,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AuthorizerEvent,
            RequestContext,
            AuthorizationDecision,
            AuthorizerContext,
            PolicyDocument,
            PolicyStatement,
            Effect,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Authorizer", description = "Gateway request authorization"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_lists_authorize_path() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/authorize"));
        assert!(doc.paths.paths.contains_key("/health/ready"));
    }
}
