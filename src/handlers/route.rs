//! URL shapes the dispatcher understands:
//!
//! - `/api/<action>/<table>[/<id>...]`, the generic API prefix
//! - `/<table>[/<rest>...]`, matched against the built-in RESTful identifiers

use crate::endpoints::{normalize_path, resolve, EndpointKind, RequestType};
use crate::error::ApiError;

const API_PREFIX: &str = "api";

const API_ACTIONS: [&str; 9] = [
    "get", "search", "exists", "count", "create", "batch", "update", "destroy", "delete",
];

/// Where a request landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub table: String,
    pub endpoint: EndpointKind,
    /// Raw id segment, when the route carries one
    pub id: Option<String>,
    /// True for `/api/...` requests; segment-based authorization rules only apply there
    pub via_api: bool,
}

/// Non-empty path segments, in order
pub fn segments(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Whether a raw request path is under the `/api` prefix
pub fn is_api_path(path: &str) -> bool {
    segments(path).first().map(String::as_str) == Some(API_PREFIX)
}

pub fn route(method: RequestType, segments: &[String]) -> Result<RouteMatch, ApiError> {
    match segments.first().map(String::as_str) {
        None => Err(ApiError::not_found("No table in path")),
        Some(API_PREFIX) => api_route(method, segments),
        Some(_) => shorthand_route(method, segments),
    }
}

fn api_route(method: RequestType, segments: &[String]) -> Result<RouteMatch, ApiError> {
    let (Some(action), Some(table)) = (segments.get(1), segments.get(2)) else {
        return Err(ApiError::not_found("Expected /api/<action>/<table>"));
    };
    let action = action.to_ascii_lowercase();
    let id = segments.get(3).cloned();

    let endpoint = match (action.as_str(), method, id.is_some()) {
        ("get", RequestType::Get, false) => EndpointKind::Get,
        ("get", RequestType::Get, true) => EndpointKind::FindOne,
        ("get", RequestType::Post, false) | ("search", RequestType::Post, false) => EndpointKind::Search,
        ("exists", RequestType::Get, true) => EndpointKind::Exists,
        ("count", RequestType::Get, false) => EndpointKind::Count,
        ("count", RequestType::Post, false) => EndpointKind::CountByPost,
        ("create", RequestType::Post, false) => EndpointKind::Create,
        ("batch", RequestType::Post, false) => EndpointKind::InsertBatch,
        ("update", RequestType::Put, true) => EndpointKind::Update,
        ("destroy", RequestType::Delete, false) => EndpointKind::Destroy,
        ("delete", RequestType::Delete, true) => EndpointKind::DeleteOne,
        (action, _, _) if API_ACTIONS.contains(&action) => {
            return Err(ApiError::bad_request(format!(
                "Invalid request type {} for /api/{}",
                method, action
            )));
        }
        (action, _, _) => return Err(ApiError::not_found(format!("Unknown API action: {}", action))),
    };

    Ok(RouteMatch {
        table: table.clone(),
        endpoint,
        id,
        via_api: true,
    })
}

fn shorthand_route(method: RequestType, segments: &[String]) -> Result<RouteMatch, ApiError> {
    let table = segments[0].clone();
    let rest = segments[1..].join("/");

    let endpoint = resolve(method, &normalize_path(&rest))
        .ok_or_else(|| ApiError::not_found(format!("No endpoint for {} /{}", method, segments.join("/"))))?;

    let id = segments[1..]
        .iter()
        .find(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .cloned();

    Ok(RouteMatch {
        table,
        endpoint: endpoint.kind,
        id,
        via_api: false,
    })
}

/// The `/api/...` shape that reaches `kind`
pub fn api_path(kind: EndpointKind) -> &'static str {
    match kind {
        EndpointKind::Get => "/api/get/<table>",
        EndpointKind::Search => "/api/search/<table>",
        EndpointKind::FindOne => "/api/get/<table>/<id>",
        EndpointKind::Exists => "/api/exists/<table>/<id>",
        EndpointKind::Count | EndpointKind::CountByPost => "/api/count/<table>",
        EndpointKind::Create => "/api/create/<table>",
        EndpointKind::InsertBatch => "/api/batch/<table>",
        EndpointKind::Update => "/api/update/<table>/<id>",
        EndpointKind::Destroy => "/api/destroy/<table>",
        EndpointKind::DeleteOne => "/api/delete/<table>/<id>",
    }
}
