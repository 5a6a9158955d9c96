use serde_json::Value;

use super::Execution;
use crate::error::ApiError;

/// `true` or `false`; lookup failures read as `false`
pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let Some(id) = exec.numeric_id() else {
        return Ok(Value::Bool(false));
    };

    let found = match exec.fetch_by_id(id).await {
        Ok(row) => row.is_some(),
        Err(e) => {
            tracing::warn!(request_id = %exec.ctx.request_id, "Exists lookup failed: {}", e);
            false
        }
    };
    Ok(Value::Bool(found))
}
