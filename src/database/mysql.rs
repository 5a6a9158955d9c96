use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::{Column, MySql, Row, TypeInfo};
use std::time::{Duration, Instant};

use super::{Database, DatabaseError, ExecResult, Row as JsonRow, SqlResult};

/// `Database` backed by a sqlx MySQL pool
#[derive(Clone)]
pub struct MySqlDatabase {
    pool: MySqlPool,
    query_logging: bool,
    slow_query_threshold: Duration,
}

impl MySqlDatabase {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            query_logging: false,
            slow_query_threshold: Duration::from_millis(1000),
        }
    }

    pub fn with_query_logging(mut self, enabled: bool, slow_query_threshold_ms: u64) -> Self {
        self.query_logging = enabled;
        self.slow_query_threshold = Duration::from_millis(slow_query_threshold_ms);
        self
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    fn observe(&self, sql: &SqlResult, started: Instant) {
        let elapsed = started.elapsed();
        if self.query_logging {
            tracing::debug!(query = %sql.query, params = sql.params.len(), "SQL executed in {}ms", elapsed.as_millis());
        }
        if elapsed > self.slow_query_threshold {
            tracing::warn!(query = %sql.query, "Slow query: {}ms", elapsed.as_millis());
        }
    }
}

#[async_trait]
impl Database for MySqlDatabase {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let rows = sqlx::query("SHOW TABLES").fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| text_at(row, 0))
            .collect::<Result<Vec<_>, _>>()
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let rows = sqlx::query(&format!("DESCRIBE {}", table)).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| text_at(row, 0))
            .collect::<Result<Vec<_>, _>>()
    }

    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<JsonRow>, DatabaseError> {
        let started = Instant::now();
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        self.observe(sql, started);

        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        let started = Instant::now();
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let result = query.execute(&self.pool).await?;
        self.observe(sql, started);

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `SHOW TABLES` and `DESCRIBE` may report names as VARCHAR or VARBINARY depending on server
fn text_at(row: &MySqlRow, index: usize) -> Result<String, DatabaseError> {
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Ok(s);
    }
    let bytes: Vec<u8> = row.try_get(index)?;
    String::from_utf8(bytes).map_err(|e| DatabaseError::QueryError(e.to_string()))
}

fn row_to_json(row: &MySqlRow) -> JsonRow {
    let mut map = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, i, column.type_info().name()));
    }
    map
}

/// How a column is read back, chosen from its reported MySQL type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnDecode {
    Bool,
    Signed,
    Unsigned,
    Float,
    Decimal,
    DateTime,
    Timestamp,
    Date,
    Time,
    Year,
    Bit,
    Json,
    Other,
}

impl ColumnDecode {
    fn for_type(type_name: &str) -> Self {
        match type_name {
            "BOOLEAN" => Self::Bool,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Self::Signed,
            t if t.ends_with("UNSIGNED") => Self::Unsigned,
            "FLOAT" | "DOUBLE" => Self::Float,
            "DECIMAL" => Self::Decimal,
            "DATETIME" => Self::DateTime,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "YEAR" => Self::Year,
            "BIT" => Self::Bit,
            "JSON" => Self::Json,
            _ => Self::Other,
        }
    }
}

/// Convert one column to JSON by its reported MySQL type
fn column_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match ColumnDecode::for_type(type_name) {
        ColumnDecode::Bool => row.try_get::<Option<bool>, _>(index).ok().map(|v| v.map(Value::Bool)),
        ColumnDecode::Signed => row.try_get::<Option<i64>, _>(index).ok().map(|v| v.map(Value::from)),
        // YEAR and BIT carry the unsigned flag on the wire
        ColumnDecode::Unsigned | ColumnDecode::Year => {
            row.try_get::<Option<u64>, _>(index).ok().map(|v| v.map(Value::from))
        }
        ColumnDecode::Bit => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .map(|v| v.map(Value::from))
            .or_else(|| {
                row.try_get::<Option<bool>, _>(index)
                    .ok()
                    .map(|v| v.map(|b| Value::from(u64::from(b))))
            }),
        ColumnDecode::Float => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .map(|v| v.and_then(Number::from_f64).map(Value::Number)),
        // Decimals keep their exact text form
        ColumnDecode::Decimal => row
            .try_get::<Option<sqlx::types::BigDecimal>, _>(index)
            .ok()
            .map(|v| v.map(|d| Value::String(d.to_string()))),
        ColumnDecode::DateTime => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .map(|v| v.map(|t| Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string()))),
        ColumnDecode::Timestamp => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .map(|v| v.map(|t| Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string()))),
        ColumnDecode::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .map(|v| v.map(|d| Value::String(d.to_string()))),
        ColumnDecode::Time => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .map(|v| v.map(|t| Value::String(t.format("%H:%M:%S").to_string()))),
        ColumnDecode::Json => row.try_get::<Option<Value>, _>(index).ok(),
        ColumnDecode::Other => None,
    };

    match value {
        Some(Some(v)) => v,
        Some(None) => Value::Null,
        None => fallback_value(row, index, type_name),
    }
}

fn fallback_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    if let Ok(s) = row.try_get::<Option<String>, _>(index) {
        return s.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(i) = row.try_get::<Option<i64>, _>(index) {
        return i.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(bytes) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return bytes
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    tracing::warn!("Unhandled MySQL type: {}, returning null", type_name);
    Value::Null
}

/// Bind a JSON parameter to a MySQL query
fn bind_param<'q>(
    q: sqlx::query::Query<'q, MySql, MySqlArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
