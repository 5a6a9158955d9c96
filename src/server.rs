use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::auth::TokenStore;
use crate::config::AppConfig;
use crate::database::Database;
use crate::endpoints::{DescriptorStore, STANDARD_ENDPOINTS};
use crate::handlers::{context::RequestContext, engine, route};
use crate::hooks::HookRegistry;

/// Collaborators shared by every request. Built once at startup; nothing in here is
/// mutated while serving.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub tokens: Arc<dyn TokenStore>,
    pub descriptors: DescriptorStore,
    pub hooks: Arc<HookRegistry>,
    pub config: Arc<AppConfig>,
}

pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    let router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Everything else goes through the endpoint dispatcher
        .fallback(dispatch)
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors);

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let expose = state.config.is_development();

    let ctx = match RequestContext::build(
        &method,
        uri.path(),
        uri.query(),
        &headers,
        &state.config.api.token_header,
        body,
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::debug!("No endpoint for {} {}: {}", method, uri.path(), e);
            return e.respond_routed(route::is_api_path(uri.path()), expose);
        }
    };

    let span = tracing::info_span!(
        "endpoint",
        request_id = %ctx.request_id,
        table = %ctx.table,
        endpoint = ctx.endpoint.name()
    );

    async move {
        tracing::debug!("Resolved {} {} via {}", ctx.method, uri.path(), if ctx.via_api { "api prefix" } else { "shorthand" });
        match engine::handle(&state, &ctx).await {
            Ok(output) => engine::respond(output, &state.config.api.token_header),
            Err(e) => {
                tracing::info!("{} {}: {}", e.status_code(), e.error_code(), e.message());
                e.respond_routed(ctx.via_api, expose)
            }
        }
    }
    .instrument(span)
    .await
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let endpoints: Vec<Value> = STANDARD_ENDPOINTS
        .iter()
        .map(|e| {
            json!({
                "name": e.name,
                "request_type": e.request_type.as_str(),
                "restful_identifier": e.restful_identifier,
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Trongate API",
            "version": version,
            "description": "Generic REST-over-SQL endpoints with per-table authorization",
            "routes": {
                "api": "/api/<action>/<table>[/<id>]",
                "shorthand": "/<table>[/<id>][/exists|/count|/search|/batch]",
                "health": "/health",
            },
            "endpoints": endpoints,
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
