// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IAM-style policy construction for authorizer responses.

use crate::models::{
    AuthorizationDecision, AuthorizerContext, Effect, PolicyDocument, PolicyStatement,
};

/// Policy language version expected by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied by every statement.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Build a single-statement decision for `resource`.
///
/// The effect is not validated; callers decide it.
pub fn build_policy(
    principal_id: &str,
    effect: Effect,
    resource: &str,
    context: Option<AuthorizerContext>,
) -> AuthorizationDecision {
    AuthorizationDecision {
        principal_id: principal_id.to_string(),
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: resource.to_string(),
            }],
        },
        context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> AuthorizerContext {
        AuthorizerContext {
            access_token: "temp-token-1-0000000000000001".to_string(),
            user_id: "user".to_string(),
            timestamp: "2026-01-01T12:00:00.000Z".to_string(),
            request_id: "req-1".to_string(),
            cached: true,
        }
    }

    #[test]
    fn allow_policy_with_context() {
        let decision = build_policy("user", Effect::Allow, "arn:x/GET/hello", Some(sample_context()));

        assert_eq!(decision.principal_id, "user");
        assert_eq!(decision.policy_document.version, POLICY_VERSION);
        assert_eq!(decision.policy_document.statement.len(), 1);
        assert_eq!(decision.policy_document.statement[0].action, INVOKE_ACTION);
        assert_eq!(decision.effect(), Some(Effect::Allow));
        assert_eq!(decision.resource(), Some("arn:x/GET/hello"));
        assert_eq!(decision.context, Some(sample_context()));
    }

    #[test]
    fn deny_policy_without_context() {
        let decision = build_policy("someone", Effect::Deny, "*", None);
        assert_eq!(decision.effect(), Some(Effect::Deny));
        assert_eq!(decision.resource(), Some("*"));
        assert!(decision.context.is_none());

        let value = serde_json::to_value(&decision).unwrap();
        assert!(value.get("context").is_none());
        assert_eq!(value["policyDocument"]["Statement"][0]["Effect"], "Deny");
    }

    #[test]
    fn same_inputs_give_same_decision() {
        let a = build_policy("user", Effect::Allow, "arn:x", Some(sample_context()));
        let b = build_policy("user", Effect::Allow, "arn:x", Some(sample_context()));
        assert_eq!(a, b);
    }
}
