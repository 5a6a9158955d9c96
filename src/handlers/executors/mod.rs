//! One routine per built-in endpoint. Each validates its input before any mutating
//! statement runs and returns the JSON body for a 200 response.

pub mod create;
pub mod delete_one;
pub mod destroy;
pub mod exists;
pub mod find_one;
pub mod get;
pub mod insert_batch;
pub mod update;

use serde_json::{Map, Value};

use crate::database::{Database, QueryBuilder, Row, ValidatedTable};
use crate::endpoints::{EndpointDescriptor, EndpointKind, RequestType};
use crate::error::ApiError;
use crate::filter::{parse_json_body, parse_query_string, FilterSet};
use crate::handlers::context::RequestContext;
use crate::hooks::InputBundle;

/// Everything an executor may read. `input` is the bundle after the before hook ran.
pub struct Execution<'a> {
    pub db: &'a dyn Database,
    pub table: &'a ValidatedTable,
    pub descriptor: &'a EndpointDescriptor,
    pub ctx: &'a RequestContext,
    pub input: &'a InputBundle,
}

impl<'a> Execution<'a> {
    pub fn query(&self) -> QueryBuilder<'a> {
        QueryBuilder::new(self.table)
    }

    /// Query-string filters for GET, body filters otherwise; nothing unless the
    /// endpoint enables params
    pub fn filters(&self) -> Result<FilterSet, ApiError> {
        if !self.descriptor.enable_params {
            return Ok(FilterSet::default());
        }
        match self.ctx.method {
            RequestType::Get => Ok(parse_query_string(&self.input.query)),
            _ => Ok(parse_json_body(&self.input.params)?),
        }
    }

    /// The id segment, if it is a non-negative integer
    pub fn numeric_id(&self) -> Option<i64> {
        self.ctx
            .id
            .as_deref()
            .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|id| id.parse().ok())
    }

    /// Posted object, required to be non-empty
    pub fn record(&self) -> Result<Map<String, Value>, ApiError> {
        match &self.input.params {
            Value::Object(map) if !map.is_empty() => Ok(map.clone()),
            Value::Object(_) | Value::Null => Err(ApiError::bad_request("Request body is empty")),
            _ => Err(ApiError::bad_request("Request body must be a JSON object")),
        }
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<Option<Row>, ApiError> {
        let rows = self.db.fetch_all(&self.query().select_by_id(id)).await?;
        Ok(rows.into_iter().next())
    }
}

pub async fn execute(exec: &Execution<'_>) -> Result<Value, ApiError> {
    match exec.ctx.endpoint {
        EndpointKind::Get | EndpointKind::Search => get::rows(exec).await,
        EndpointKind::Count | EndpointKind::CountByPost => get::count(exec).await,
        EndpointKind::FindOne => find_one::run(exec).await,
        EndpointKind::Exists => exists::run(exec).await,
        EndpointKind::Create => create::run(exec).await,
        EndpointKind::InsertBatch => insert_batch::run(exec).await,
        EndpointKind::Update => update::run(exec).await,
        EndpointKind::Destroy => destroy::run(exec).await,
        EndpointKind::DeleteOne => delete_one::run(exec).await,
    }
}
