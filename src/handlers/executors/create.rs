use serde_json::Value;

use super::Execution;
use crate::error::ApiError;

/// Insert the posted object and return the stored row
pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let record = exec.record()?;
    let sql = exec.query().insert(&record)?;

    let result = exec.db.execute(&sql).await?;
    let id = i64::try_from(result.last_insert_id)
        .map_err(|_| ApiError::internal_server_error("Insert id out of range"))?;

    // Separate statement; a concurrent delete can make this come back empty
    let row = exec.fetch_by_id(id).await?;
    Ok(row.map(Value::Object).unwrap_or(Value::Null))
}
