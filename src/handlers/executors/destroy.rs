use serde_json::Value;

use super::Execution;
use crate::auth::token_store::as_int;
use crate::error::ApiError;

/// Delete every row matching the filters from the resolved table; returns the count
pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let filters = exec.filters()?;
    if filters.conditions.is_empty() {
        tracing::warn!(
            request_id = %exec.ctx.request_id,
            "Destroy on {} without conditions removes every row",
            exec.table.name()
        );
    }

    let rows = exec.db.fetch_all(&exec.query().select_ids(&filters)?).await?;
    let ids: Vec<i64> = rows.iter().map(|row| as_int(row.get("id"))).collect();
    if ids.is_empty() {
        return Ok(Value::from(0));
    }

    let result = exec.db.execute(&exec.query().delete_by_ids(&ids)).await?;
    Ok(Value::from(result.rows_affected))
}
