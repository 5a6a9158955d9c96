use serde_json::Value;

use super::Execution;
use crate::error::ApiError;

pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let id = exec
        .numeric_id()
        .ok_or_else(|| ApiError::bad_request("Delete requires a numeric id"))?;

    if exec.fetch_by_id(id).await?.is_none() {
        return Err(ApiError::unprocessable_entity(format!(
            "No {} record with id {}",
            exec.table.name(),
            id
        )));
    }

    exec.db.execute(&exec.query().delete_by_id(id)).await?;
    Ok(Value::Bool(true))
}
