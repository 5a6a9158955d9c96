//! Per-endpoint authorization ladder.
//!
//! Rules are tried in a fixed order and the first one that admits the caller wins. Segment
//! and ownership rules read URL segments, so they only run for `/api/...` requests where
//! the segment layout is known.

use super::token_store::{as_int, token_fingerprint, CallerIdentity, TokenStore};
use crate::database::{Database, QueryBuilder, ValidatedTable};
use crate::endpoints::{Authorization, EndpointDescriptor, UserOwnedSegment};
use crate::error::ApiError;
use crate::handlers::context::RequestContext;

/// Column holding the owning user on tables guarded by `userOwnedSegment`
pub const OWNER_COLUMN: &str = "trongate_user_id";

/// User id the bypass token acts as
pub const BYPASS_USER_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Carries the token to echo back, if any
    Allowed(Option<String>),
    Denied { status: u16, message: String },
}

impl AuthDecision {
    fn denied(status: u16, message: impl Into<String>) -> Self {
        AuthDecision::Denied {
            status,
            message: message.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed(_))
    }

    pub fn into_result(self) -> Result<Option<String>, ApiError> {
        match self {
            AuthDecision::Allowed(token) => Ok(token),
            AuthDecision::Denied { status, message } => Err(ApiError::from_status(status, message)),
        }
    }
}

/// Collaborators the ladder needs
pub struct Authorizer<'a> {
    pub tokens: &'a dyn TokenStore,
    pub db: &'a dyn Database,
    /// Disabled when `None`
    pub bypass_token: Option<&'a str>,
    pub audit: bool,
}

impl<'a> Authorizer<'a> {
    pub async fn evaluate(
        &self,
        descriptor: &EndpointDescriptor,
        token: Option<&str>,
        table: &ValidatedTable,
        ctx: &RequestContext,
    ) -> AuthDecision {
        let decision = self.ladder(descriptor, token, table, ctx).await;
        self.record(&decision, token, ctx);
        decision
    }

    async fn ladder(
        &self,
        descriptor: &EndpointDescriptor,
        token: Option<&str>,
        table: &ValidatedTable,
        ctx: &RequestContext,
    ) -> AuthDecision {
        let policy = match &descriptor.authorization {
            None => return AuthDecision::denied(412, "API endpoint not activated"),
            Some(Authorization::Wildcard) => return AuthDecision::Allowed(token.map(str::to_string)),
            Some(Authorization::Policy(policy)) => policy,
        };

        let Some(token) = token else {
            return AuthDecision::denied(401, "Missing token");
        };
        let allowed = AuthDecision::Allowed(Some(token.to_string()));

        let caller = match self.tokens.resolve(token).await {
            Ok(caller) => caller,
            Err(e) => {
                if self.bypass_token.is_some_and(|bypass| bypass == token) {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        "Bypass token used for {} on {} (user id {})",
                        ctx.endpoint.name(),
                        ctx.table,
                        BYPASS_USER_ID
                    );
                    return allowed;
                }
                tracing::debug!(request_id = %ctx.request_id, "Token rejected: {}", e);
                return AuthDecision::denied(401, "Invalid token");
            }
        };

        if policy.roles.iter().any(|r| r == &caller.user_level) {
            return allowed;
        }
        if policy.user_ids.iter().any(|id| id.parse::<i64>().ok() == Some(caller.user_id)) {
            return allowed;
        }

        if ctx.via_api {
            if segment_matches(ctx, policy.user_id_segment, &caller.user_id.to_string())
                || segment_matches(ctx, policy.user_code_segment, &caller.user_code)
            {
                return allowed;
            }

            if let Some(owned) = &policy.user_owned_segment {
                if self.owns_row(owned, &caller, table, ctx).await {
                    return allowed;
                }
                return AuthDecision::denied(401, "Not the owner of this record");
            }
        }

        AuthDecision::denied(401, "Not authorized")
    }

    /// Fetch the row named by the segment and compare its owner with the caller
    async fn owns_row(
        &self,
        owned: &UserOwnedSegment,
        caller: &CallerIdentity,
        table: &ValidatedTable,
        ctx: &RequestContext,
    ) -> bool {
        let Some(value) = ctx.segment(owned.segment_num) else {
            return false;
        };

        let sql = match QueryBuilder::new(table).select_by_column(&owned.column, value) {
            Ok(sql) => sql,
            Err(e) => {
                tracing::warn!("Ownership rule on {} is misconfigured: {}", table.name(), e);
                return false;
            }
        };

        let rows = match self.db.fetch_all(&sql).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id, "Ownership lookup failed: {}", e);
                return false;
            }
        };

        let Some(row) = rows.first() else {
            return false;
        };
        let owner = as_int(row.get(OWNER_COLUMN));
        owner != 0 && owner == caller.user_id
    }

    fn record(&self, decision: &AuthDecision, token: Option<&str>, ctx: &RequestContext) {
        let fingerprint = token.map(token_fingerprint).unwrap_or_else(|| "-".to_string());
        match decision {
            AuthDecision::Allowed(_) if self.audit => tracing::info!(
                request_id = %ctx.request_id,
                token = %fingerprint,
                "Allowed {} on {}",
                ctx.endpoint.name(),
                ctx.table
            ),
            AuthDecision::Allowed(_) => tracing::debug!(
                request_id = %ctx.request_id,
                token = %fingerprint,
                "Allowed {} on {}",
                ctx.endpoint.name(),
                ctx.table
            ),
            AuthDecision::Denied { status, message } => tracing::info!(
                request_id = %ctx.request_id,
                token = %fingerprint,
                "Denied {} on {}: {} {}",
                ctx.endpoint.name(),
                ctx.table,
                status,
                message
            ),
        }
    }
}

fn segment_matches(ctx: &RequestContext, index: Option<usize>, expected: &str) -> bool {
    match index.and_then(|i| ctx.segment(i)) {
        Some(segment) => !expected.is_empty() && segment == expected,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::{EndpointKind, RequestType};
    use crate::testing::{request_context, MemoryDatabase, StaticTokenStore};
    use serde_json::json;

    fn descriptor(authorization: serde_json::Value) -> EndpointDescriptor {
        let mut raw = json!({"request_type": "GET"});
        if !authorization.is_null() {
            raw["authorization"] = authorization;
        }
        serde_json::from_value(raw).unwrap()
    }

    fn tokens() -> StaticTokenStore {
        StaticTokenStore::new()
            .with("admin-token", CallerIdentity { user_id: 1, user_level: "admin".into(), user_code: "adm".into() })
            .with("member-token", CallerIdentity { user_id: 7, user_level: "member".into(), user_code: "m7code".into() })
    }

    fn tasks() -> ValidatedTable {
        ValidatedTable::for_tests("tasks", &["id", "code", "trongate_user_id"])
    }

    async fn run(
        descriptor: &EndpointDescriptor,
        token: Option<&str>,
        path: &str,
        db: &MemoryDatabase,
        bypass: Option<&str>,
    ) -> AuthDecision {
        let tokens = tokens();
        let ctx = request_context(RequestType::Get, path, token);
        Authorizer { tokens: &tokens, db, bypass_token: bypass, audit: false }
            .evaluate(descriptor, token, &tasks(), &ctx)
            .await
    }

    #[tokio::test]
    async fn missing_authorization_is_not_activated() {
        let d = descriptor(serde_json::Value::Null);
        let decision = run(&d, Some("admin-token"), "/api/get/tasks", &MemoryDatabase::new(), None).await;
        assert!(matches!(decision, AuthDecision::Denied { status: 412, .. }));
    }

    #[tokio::test]
    async fn wildcard_allows_without_token() {
        let d = descriptor(json!("*"));
        let decision = run(&d, None, "/api/get/tasks", &MemoryDatabase::new(), None).await;
        assert_eq!(decision, AuthDecision::Allowed(None));
    }

    #[tokio::test]
    async fn roles_policy() {
        let d = descriptor(json!({"roles": ["admin"]}));
        let db = MemoryDatabase::new();
        assert!(run(&d, Some("admin-token"), "/api/get/tasks", &db, None).await.is_allowed());
        assert!(matches!(
            run(&d, Some("member-token"), "/api/get/tasks", &db, None).await,
            AuthDecision::Denied { status: 401, .. }
        ));
        assert!(matches!(
            run(&d, None, "/api/get/tasks", &db, None).await,
            AuthDecision::Denied { status: 401, .. }
        ));
    }

    #[tokio::test]
    async fn user_ids_match_numerically() {
        let d = descriptor(json!({"userIds": [7]}));
        assert!(run(&d, Some("member-token"), "/api/get/tasks", &MemoryDatabase::new(), None).await.is_allowed());
    }

    #[tokio::test]
    async fn bypass_token_only_when_configured() {
        let d = descriptor(json!({"roles": ["admin"]}));
        let db = MemoryDatabase::new();
        assert!(!run(&d, Some("aaa"), "/api/get/tasks", &db, None).await.is_allowed());
        assert!(run(&d, Some("aaa"), "/api/get/tasks", &db, Some("aaa")).await.is_allowed());
        assert!(!run(&d, Some("bbb"), "/api/get/tasks", &db, Some("aaa")).await.is_allowed());
    }

    #[tokio::test]
    async fn segment_rules_only_on_api_prefix() {
        let d = descriptor(json!({"userIdSegment": 4}));
        let db = MemoryDatabase::new();
        assert!(run(&d, Some("member-token"), "/api/get/tasks/7", &db, None).await.is_allowed());
        assert!(!run(&d, Some("member-token"), "/api/get/tasks/8", &db, None).await.is_allowed());
        assert!(!run(&d, Some("member-token"), "/tasks/7", &db, None).await.is_allowed());

        let d = descriptor(json!({"userCodeSegment": 4}));
        assert!(run(&d, Some("member-token"), "/api/exists/tasks/m7code", &db, None).await.is_allowed());
    }

    #[tokio::test]
    async fn ownership_compares_owner_as_integer() {
        let d = descriptor(json!({"userOwnedSegment": {"column": "code", "segmentNum": 4}}));
        let db = MemoryDatabase::new()
            .with_table("tasks", &["id", "code", "trongate_user_id"])
            .with_rows(
                "tasks",
                vec![
                    json!({"id": 1, "code": "mine", "trongate_user_id": "7"}),
                    json!({"id": 2, "code": "theirs", "trongate_user_id": 1}),
                    json!({"id": 3, "code": "orphan", "trongate_user_id": 0}),
                ],
            );

        assert!(run(&d, Some("member-token"), "/api/get/tasks/mine", &db, None).await.is_allowed());
        assert!(!run(&d, Some("member-token"), "/api/get/tasks/theirs", &db, None).await.is_allowed());
        assert!(!run(&d, Some("member-token"), "/api/get/tasks/orphan", &db, None).await.is_allowed());
        assert!(!run(&d, Some("member-token"), "/api/get/tasks/missing", &db, None).await.is_allowed());

        let lookup = db.executed().into_iter().find(|s| s.query.contains("WHERE code=?")).unwrap();
        assert_eq!(lookup.params, vec![json!("mine")]);
    }

    #[test]
    fn endpoint_kind_in_context() {
        let ctx = request_context(RequestType::Get, "/api/get/tasks/3", None);
        assert_eq!(ctx.endpoint, EndpointKind::FindOne);
    }
}
