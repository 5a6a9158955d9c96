use serde_json::{Map, Value};

use super::Execution;
use crate::error::ApiError;

/// One multi-row insert; returns how many rows went in
pub async fn run(exec: &Execution<'_>) -> Result<Value, ApiError> {
    let records = records(&exec.input.params)?;
    let sql = exec.query().insert_batch(&records)?;
    let result = exec.db.execute(&sql).await?;
    Ok(Value::from(result.rows_affected))
}

/// A non-empty array of objects that all share the first object's keys
fn records(params: &Value) -> Result<Vec<Map<String, Value>>, ApiError> {
    let Value::Array(items) = params else {
        return Err(ApiError::bad_request("Request body must be a JSON array of objects"));
    };
    if items.is_empty() {
        return Err(ApiError::bad_request("Request body is empty"));
    }

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) if !map.is_empty() => records.push(map.clone()),
            _ => return Err(ApiError::bad_request(format!("Item {} is not a non-empty object", i))),
        }
    }

    let first = &records[0];
    for (i, record) in records.iter().enumerate().skip(1) {
        if record.len() != first.len() || !first.keys().all(|k| record.contains_key(k)) {
            return Err(ApiError::bad_request(format!("Item {} does not have the same fields as item 0", i)));
        }
    }
    Ok(records)
}
