//! The fixed request shape every built-in endpoint shares: settings, verb check,
//! identifier gate, authorization, before hook, executor, after hook, response.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::context::RequestContext;
use super::executors::{self, Execution};
use crate::auth::Authorizer;
use crate::database::ValidatedTable;
use crate::error::ApiError;
use crate::filter::FilterError;
use crate::hooks::{InputBundle, OutputBundle};
use crate::server::AppState;

pub async fn handle(state: &AppState, ctx: &RequestContext) -> Result<OutputBundle, ApiError> {
    let descriptor = state.descriptors.descriptor(&ctx.table, ctx.endpoint).await?;
    if descriptor.request_type != ctx.method {
        return Err(ApiError::bad_request(format!(
            "Invalid request type: {} expects {}, got {}",
            ctx.endpoint.name(),
            descriptor.request_type,
            ctx.method
        )));
    }

    let table = ValidatedTable::load(state.db.as_ref(), &ctx.table).await?;

    let authorizer = Authorizer {
        tokens: state.tokens.as_ref(),
        db: state.db.as_ref(),
        bypass_token: state.config.security.bypass_token.as_deref(),
        audit: state.config.security.enable_audit_logging,
    };
    let token = authorizer
        .evaluate(&descriptor, ctx.token.as_deref(), &table, ctx)
        .await
        .into_result()?;

    let mut input = InputBundle {
        token,
        table: table.name().to_string(),
        endpoint: ctx.endpoint.name().to_string(),
        params: decode_params(ctx)?,
        query: ctx.query.clone(),
    };
    if let Some(hook) = &descriptor.before_hook {
        input = state.hooks.before(hook, input).await?;
    }

    let exec = Execution {
        db: state.db.as_ref(),
        table: &table,
        descriptor: &descriptor,
        ctx,
        input: &input,
    };
    let body = executors::execute(&exec).await?;

    let mut output = OutputBundle {
        body,
        code: 200,
        token: input.token.clone(),
    };
    if let Some(hook) = &descriptor.after_hook {
        output = state.hooks.after(hook, output).await?;
    }
    Ok(output)
}

/// JSON body of a non-GET request; `Null` for GET and for empty bodies
fn decode_params(ctx: &RequestContext) -> Result<Value, ApiError> {
    if ctx.method == crate::endpoints::RequestType::Get || ctx.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&ctx.body).map_err(|e| FilterError::InvalidJson(e).into())
}

/// Emit exactly the output bundle: status, JSON body, token header
pub fn respond(output: OutputBundle, token_header: &str) -> Response {
    let status = StatusCode::from_u16(output.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = output.body.to_string();
    let mut response = (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();

    if let Some(token) = output.token {
        match (HeaderName::try_from(token_header), HeaderValue::from_str(&token)) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!("Token could not be echoed in header {}", token_header),
        }
    }
    response
}
