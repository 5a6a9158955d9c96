use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use uuid::Uuid;

use super::route::{self, RouteMatch};
use crate::endpoints::{EndpointKind, RequestType};
use crate::error::ApiError;

pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";

/// Everything the engine needs to know about one request, built once at entry
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    /// Effective method, after `X-HTTP-Method-Override`
    pub method: RequestType,
    pub table: String,
    pub endpoint: EndpointKind,
    pub id: Option<String>,
    /// Path segments; `segment(1)` is the first
    pub segments: Vec<String>,
    pub token: Option<String>,
    pub query: String,
    pub body: Bytes,
    pub via_api: bool,
}

impl RequestContext {
    pub fn build(
        method: &Method,
        path: &str,
        query: Option<&str>,
        headers: &HeaderMap,
        token_header: &str,
        body: Bytes,
    ) -> Result<Self, ApiError> {
        let method = effective_method(method, headers)?;
        let segments = route::segments(path);
        let RouteMatch { table, endpoint, id, via_api } = route::route(method, &segments)?;

        let token = headers
            .get(token_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self {
            request_id: Uuid::new_v4(),
            method,
            table,
            endpoint,
            id,
            segments,
            token,
            query: query.unwrap_or_default().to_string(),
            body,
            via_api,
        })
    }

    /// 1-based URL segment lookup
    pub fn segment(&self, index: usize) -> Option<&str> {
        index.checked_sub(1).and_then(|i| self.segments.get(i)).map(String::as_str)
    }
}

/// The override header only applies when the transport method is not GET
pub fn effective_method(method: &Method, headers: &HeaderMap) -> Result<RequestType, ApiError> {
    if method != Method::GET {
        if let Some(value) = headers.get(METHOD_OVERRIDE_HEADER) {
            let value = value
                .to_str()
                .map_err(|_| ApiError::bad_request("Invalid method override header"))?;
            return value.parse().map_err(ApiError::bad_request);
        }
    }
    method.as_str().parse().map_err(ApiError::bad_request)
}
