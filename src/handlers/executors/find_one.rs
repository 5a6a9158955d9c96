use serde_json::Value;

use super::Execution;
use crate::error::ApiError;

pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let id = exec
        .numeric_id()
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    match exec.fetch_by_id(id).await? {
        Some(row) => Ok(Value::Object(row)),
        None => Err(ApiError::not_found(format!("No {} record with id {}", exec.table.name(), id))),
    }
}
