use serde_json::{Map, Value};

use crate::database::schema::{SchemaError, ValidatedTable};
use crate::filter::{FilterCondition, FilterSet};

/// Rendered SQL with `?` placeholders and the values to bind, in order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

impl SqlResult {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self { query: query.into(), params }
    }
}

/// Append WHERE / ORDER BY / LIMIT clauses to `base_select`.
///
/// Conditions render as `<column><operator>?` in input order; the first condition's
/// conjunction is dropped. `LIMIT` uses MySQL's `offset, count` form and is only emitted when
/// a limit or offset was given, with the missing side defaulting to `0` or `u64::MAX`.
/// Identifiers are not checked here: callers hand in names already validated.
pub fn build(
    base_select: &str,
    conditions: &[FilterCondition],
    order_by: Option<&str>,
    limit: Option<u64>,
    offset: Option<u64>,
) -> SqlResult {
    let mut query = String::from(base_select);
    let mut params = Vec::with_capacity(conditions.len());

    for (i, condition) in conditions.iter().enumerate() {
        if i == 0 {
            query.push_str(" WHERE ");
        } else {
            query.push(' ');
            query.push_str(condition.conjunction.to_sql());
            query.push(' ');
        }
        query.push_str(&condition.column);
        query.push_str(condition.operator.to_sql());
        query.push('?');
        params.push(Value::String(condition.value.clone()));
    }

    if let Some(order_by) = order_by {
        query.push_str(" ORDER BY ");
        query.push_str(order_by);
    }

    if limit.is_some() || offset.is_some() {
        query.push_str(&format!(" LIMIT {}, {}", offset.unwrap_or(0), limit.unwrap_or(u64::MAX)));
    }

    SqlResult { query, params }
}

/// Statement renderers bound to one validated table
pub struct QueryBuilder<'t> {
    table: &'t ValidatedTable,
}

impl<'t> QueryBuilder<'t> {
    pub fn new(table: &'t ValidatedTable) -> Self {
        Self { table }
    }

    /// `SELECT * FROM <table>` with the filter applied
    pub fn select(&self, filters: &FilterSet) -> Result<SqlResult, SchemaError> {
        self.filtered(&format!("SELECT * FROM {}", self.table.name()), filters)
    }

    /// `SELECT COUNT(*)` over the WHERE part only. Ordering and paging would skip the
    /// single aggregate row.
    pub fn count(&self, filters: &FilterSet) -> Result<SqlResult, SchemaError> {
        self.table.require_columns(filters.conditions.iter().map(|c| c.column.as_str()))?;
        Ok(build(
            &format!("SELECT COUNT(*) AS count FROM {}", self.table.name()),
            &filters.conditions,
            None,
            None,
            None,
        ))
    }

    /// Ids of the rows matching the filter
    pub fn select_ids(&self, filters: &FilterSet) -> Result<SqlResult, SchemaError> {
        self.table.column("id")?;
        self.filtered(&format!("SELECT id FROM {}", self.table.name()), filters)
    }

    pub fn select_by_id(&self, id: i64) -> SqlResult {
        SqlResult::new(format!("SELECT * FROM {} WHERE id=?", self.table.name()), vec![Value::from(id)])
    }

    pub fn select_by_column(&self, column: &str, value: &str) -> Result<SqlResult, SchemaError> {
        let column = self.table.column(column)?;
        Ok(SqlResult::new(
            format!("SELECT * FROM {} WHERE {}=?", self.table.name(), column),
            vec![Value::String(value.to_string())],
        ))
    }

    pub fn insert(&self, record: &Map<String, Value>) -> Result<SqlResult, SchemaError> {
        self.table.require_columns(record.keys().map(String::as_str))?;

        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        Ok(SqlResult::new(
            format!("INSERT INTO {} ({}) VALUES ({})", self.table.name(), columns.join(", "), placeholders),
            record.values().map(bind_value).collect(),
        ))
    }

    /// One multi-row INSERT. Every record must carry the column set of the first one.
    pub fn insert_batch(&self, records: &[Map<String, Value>]) -> Result<SqlResult, SchemaError> {
        let Some(first) = records.first() else {
            return Ok(SqlResult::new(String::new(), vec![]));
        };
        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        self.table.require_columns(columns.iter().copied())?;

        let row = format!("({})", vec!["?"; columns.len()].join(", "));
        let mut params = Vec::with_capacity(columns.len() * records.len());
        for record in records {
            for column in &columns {
                params.push(record.get(*column).map(bind_value).unwrap_or(Value::Null));
            }
        }

        Ok(SqlResult::new(
            format!(
                "INSERT INTO {} ({}) VALUES {}",
                self.table.name(),
                columns.join(", "),
                vec![row; records.len()].join(", ")
            ),
            params,
        ))
    }

    pub fn update_by_id(&self, id: i64, record: &Map<String, Value>) -> Result<SqlResult, SchemaError> {
        self.table.require_columns(record.keys().map(String::as_str))?;

        let assignments: Vec<String> = record.keys().map(|c| format!("{}=?", c)).collect();
        let mut params: Vec<Value> = record.values().map(bind_value).collect();
        params.push(Value::from(id));

        Ok(SqlResult::new(
            format!("UPDATE {} SET {} WHERE id=?", self.table.name(), assignments.join(", ")),
            params,
        ))
    }

    pub fn delete_by_id(&self, id: i64) -> SqlResult {
        SqlResult::new(format!("DELETE FROM {} WHERE id=?", self.table.name()), vec![Value::from(id)])
    }

    pub fn delete_by_ids(&self, ids: &[i64]) -> SqlResult {
        let placeholders = vec!["?"; ids.len()].join(", ");
        SqlResult::new(
            format!("DELETE FROM {} WHERE id IN ({})", self.table.name(), placeholders),
            ids.iter().map(|id| Value::from(*id)).collect(),
        )
    }

    fn filtered(&self, base: &str, filters: &FilterSet) -> Result<SqlResult, SchemaError> {
        self.table.require_columns(filters.conditions.iter().map(|c| c.column.as_str()))?;
        let order_by = filters.order_by.as_deref().map(|o| self.table.order_by(o)).transpose()?;
        Ok(build(base, &filters.conditions, order_by, filters.limit, filters.offset))
    }
}

/// Nested JSON is stored as its text form (JSON columns)
fn bind_value(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}
