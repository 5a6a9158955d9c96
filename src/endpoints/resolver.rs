//! Maps an effective HTTP method and a normalized resource path onto one of the
//! built-in endpoints.

use super::descriptor::RequestType;

/// One of the eleven standard endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Get,
    Search,
    FindOne,
    Exists,
    Count,
    CountByPost,
    Create,
    InsertBatch,
    Update,
    Destroy,
    DeleteOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardEndpoint {
    pub kind: EndpointKind,
    /// Key used in the table's descriptor document
    pub name: &'static str,
    pub request_type: RequestType,
    pub restful_identifier: &'static str,
}

pub const STANDARD_ENDPOINTS: [StandardEndpoint; 11] = [
    StandardEndpoint { kind: EndpointKind::Get, name: "Get", request_type: RequestType::Get, restful_identifier: "" },
    StandardEndpoint { kind: EndpointKind::Search, name: "Search", request_type: RequestType::Post, restful_identifier: "search" },
    StandardEndpoint { kind: EndpointKind::FindOne, name: "Find One", request_type: RequestType::Get, restful_identifier: "{id}" },
    StandardEndpoint { kind: EndpointKind::Exists, name: "Exists", request_type: RequestType::Get, restful_identifier: "{id}/exists" },
    StandardEndpoint { kind: EndpointKind::Count, name: "Count", request_type: RequestType::Get, restful_identifier: "count" },
    StandardEndpoint { kind: EndpointKind::CountByPost, name: "Count By Post", request_type: RequestType::Post, restful_identifier: "count" },
    StandardEndpoint { kind: EndpointKind::Create, name: "Create", request_type: RequestType::Post, restful_identifier: "" },
    StandardEndpoint { kind: EndpointKind::InsertBatch, name: "Insert Batch", request_type: RequestType::Post, restful_identifier: "batch" },
    StandardEndpoint { kind: EndpointKind::Update, name: "Update", request_type: RequestType::Put, restful_identifier: "{id}" },
    StandardEndpoint { kind: EndpointKind::Destroy, name: "Destroy", request_type: RequestType::Delete, restful_identifier: "" },
    StandardEndpoint { kind: EndpointKind::DeleteOne, name: "Delete One", request_type: RequestType::Delete, restful_identifier: "{id}" },
];

impl EndpointKind {
    pub fn standard(self) -> &'static StandardEndpoint {
        // STANDARD_ENDPOINTS is declared in enum order
        &STANDARD_ENDPOINTS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.standard().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        STANDARD_ENDPOINTS.iter().find(|e| e.name == name).map(|e| e.kind)
    }
}

/// Replace every all-digit segment with `{id}` and drop empty segments
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| if s.bytes().all(|b| b.is_ascii_digit()) { "{id}" } else { s })
        .collect::<Vec<_>>()
        .join("/")
}

/// Exact match on `(request_type, restful_identifier)`. `path` is the part after the
/// table name and must already be normalized.
pub fn resolve(method: RequestType, path: &str) -> Option<&'static StandardEndpoint> {
    let path = path.trim_matches('/');
    STANDARD_ENDPOINTS
        .iter()
        .find(|e| e.request_type == method && e.restful_identifier == path)
}
