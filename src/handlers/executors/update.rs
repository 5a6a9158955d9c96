use serde_json::Value;

use super::Execution;
use crate::error::ApiError;

/// Update by id and return the stored row. A posted `id` is ignored.
pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let id = exec
        .numeric_id()
        .ok_or_else(|| ApiError::bad_request("Update requires a numeric id"))?;

    let mut record = exec.record()?;
    record.remove("id");
    if record.is_empty() {
        return Err(ApiError::bad_request("Nothing to update"));
    }
    let sql = exec.query().update_by_id(id, &record)?;

    if exec.fetch_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(format!("No {} record with id {}", exec.table.name(), id)));
    }

    exec.db.execute(&sql).await?;
    let row = exec.fetch_by_id(id).await?;
    Ok(row.map(Value::Object).unwrap_or(Value::Null))
}
