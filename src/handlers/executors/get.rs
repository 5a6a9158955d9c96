use serde_json::Value;

use super::Execution;
use crate::auth::token_store::as_int;
use crate::error::ApiError;

/// Get and Search: matching rows as an array
pub async fn rows(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let filters = exec.filters()?;
    let sql = exec.query().select(&filters)?;
    let rows = exec.db.fetch_all(&sql).await?;
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

/// Count and Count By Post: a bare integer
pub async fn count(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let filters = exec.filters()?;
    let sql = exec.query().count(&filters)?;
    let rows = exec.db.fetch_all(&sql).await?;
    let count = rows.first().map(|row| as_int(row.get("count"))).unwrap_or(0);
    Ok(Value::from(count))
}
