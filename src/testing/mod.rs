//! Test doubles shared by the unit tests.
//!
//! `MemoryDatabase` interprets the handful of statement shapes the query builder emits
//! (filtered SELECT / COUNT / id SELECT, INSERT, UPDATE by id, DELETE) over in-memory rows
//! and records every statement it receives.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::auth::{CallerIdentity, TokenError, TokenStore};
use crate::config::AppConfig;
use crate::database::{Database, DatabaseError, ExecResult, Row, SqlResult, ValidatedTable};
use crate::endpoints::{DescriptorStore, EndpointDescriptor, RequestType};
use crate::error::ApiError;
use crate::handlers::context::RequestContext;
use crate::handlers::executors::{self, Execution};
use crate::hooks::{Hook, HookError, HookPayload, HookRegistry, InputBundle};
use crate::server::AppState;

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    responses: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, String)>,
    executed: Mutex<Vec<SqlResult>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, columns: &[&str]) -> Self {
        self.tables.lock().unwrap().insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn with_rows(self, name: &str, rows: Vec<Value>) -> Self {
        {
            let mut tables = self.tables.lock().unwrap();
            let table = tables.entry(name.to_string()).or_default();
            table.rows.extend(rows.into_iter().map(object));
        }
        self
    }

    /// Canned result for any fetch whose SQL starts with `prefix`
    pub fn with_response(mut self, prefix: &str, rows: Vec<Value>) -> Self {
        self.responses.push((prefix.to_string(), rows.into_iter().map(object).collect()));
        self
    }

    /// Any statement containing `fragment` fails with `message`
    pub fn fail_on(mut self, fragment: &str, message: &str) -> Self {
        self.failures.push((fragment.to_string(), message.to_string()));
        self
    }

    pub fn executed(&self) -> Vec<SqlResult> {
        self.executed.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.executed().into_iter().map(|s| s.query).collect()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &SqlResult) -> Result<(), DatabaseError> {
        self.executed.lock().unwrap().push(sql.clone());
        match self.failures.iter().find(|(fragment, _)| sql.query.contains(fragment.as_str())) {
            Some((_, message)) => Err(DatabaseError::QueryError(message.clone())),
            None => Ok(()),
        }
    }

    fn select(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError> {
        let rest = sql
            .query
            .strip_prefix("SELECT ")
            .ok_or_else(|| unsupported(sql))?;
        let (projection, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(sql))?;
        let (table, clause) = rest.split_once(' ').unwrap_or((rest, ""));
        let padded = format!(" {}", clause);
        let mut clause = padded.as_str();

        let mut limit = None;
        if let Some((before, l)) = clause.split_once(" LIMIT ") {
            let (offset, count) = l.split_once(", ").ok_or_else(|| unsupported(sql))?;
            limit = Some((offset.parse::<usize>().unwrap_or(0), count.parse::<u64>().unwrap_or(u64::MAX)));
            clause = before;
        }
        let mut order = None;
        if let Some((before, o)) = clause.split_once(" ORDER BY ") {
            order = Some(o.to_string());
            clause = before;
        }
        let where_clause = clause.trim().strip_prefix("WHERE ").unwrap_or("");

        let tables = self.tables.lock().unwrap();
        let source = tables.get(table).ok_or_else(|| missing_table(table))?;
        let mut rows: Vec<Row> = source
            .rows
            .iter()
            .filter(|row| matches(row, where_clause, &sql.params))
            .cloned()
            .collect();

        if let Some(order) = order {
            sort_rows(&mut rows, &order);
        }
        if let Some((offset, count)) = limit {
            let count = usize::try_from(count).unwrap_or(usize::MAX);
            rows = rows.into_iter().skip(offset).take(count).collect();
        }

        Ok(match projection {
            "*" => rows,
            "COUNT(*) AS count" => vec![object(serde_json::json!({"count": rows.len()}))],
            column => rows
                .into_iter()
                .map(|row| {
                    let mut projected = Map::new();
                    projected.insert(column.to_string(), row.get(column).cloned().unwrap_or(Value::Null));
                    projected
                })
                .collect(),
        })
    }

    fn insert(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        let rest = sql.query.strip_prefix("INSERT INTO ").ok_or_else(|| unsupported(sql))?;
        let (table, rest) = rest.split_once(" (").ok_or_else(|| unsupported(sql))?;
        let (columns, _) = rest.split_once(") VALUES ").ok_or_else(|| unsupported(sql))?;
        let columns: Vec<&str> = columns.split(", ").collect();

        let mut tables = self.tables.lock().unwrap();
        let target = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let mut next_id = target.rows.iter().map(|r| int(r.get("id"))).max().unwrap_or(0) + 1;
        let first_id = next_id;

        let mut inserted = 0;
        for values in sql.params.chunks(columns.len()) {
            let mut row = Map::new();
            if !columns.contains(&"id") {
                row.insert("id".to_string(), Value::from(next_id));
                next_id += 1;
            }
            for (column, value) in columns.iter().zip(values) {
                row.insert(column.to_string(), value.clone());
            }
            target.rows.push(row);
            inserted += 1;
        }

        Ok(ExecResult {
            rows_affected: inserted,
            last_insert_id: first_id as u64,
        })
    }

    fn update(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        let rest = sql.query.strip_prefix("UPDATE ").ok_or_else(|| unsupported(sql))?;
        let (table, rest) = rest.split_once(" SET ").ok_or_else(|| unsupported(sql))?;
        let (assignments, where_clause) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(sql))?;
        let columns: Vec<&str> = assignments.split(", ").map(|a| a.trim_end_matches("=?")).collect();
        let (values, where_params) = sql.params.split_at(columns.len());

        let mut tables = self.tables.lock().unwrap();
        let target = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let mut affected = 0;
        for row in target.rows.iter_mut().filter(|row| matches(row, where_clause, where_params)) {
            for (column, value) in columns.iter().zip(values) {
                row.insert(column.to_string(), value.clone());
            }
            affected += 1;
        }
        Ok(ExecResult { rows_affected: affected, last_insert_id: 0 })
    }

    fn delete(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        let rest = sql.query.strip_prefix("DELETE FROM ").ok_or_else(|| unsupported(sql))?;
        let (table, where_clause) = rest.split_once(" WHERE ").unwrap_or((rest, ""));

        let mut tables = self.tables.lock().unwrap();
        let target = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let before = target.rows.len();
        target.rows.retain(|row| !matches(row, where_clause, &sql.params));
        Ok(ExecResult {
            rows_affected: (before - target.rows.len()) as u64,
            last_insert_id: 0,
        })
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        self.record(&SqlResult::new("SHOW TABLES", vec![]))?;
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        self.record(&SqlResult::new(format!("DESCRIBE {}", table), vec![]))?;
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| missing_table(table))
    }

    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError> {
        self.record(sql)?;
        if let Some((_, rows)) = self.responses.iter().find(|(prefix, _)| sql.query.starts_with(prefix.as_str())) {
            return Ok(rows.clone());
        }
        self.select(sql)
    }

    async fn execute(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        self.record(sql)?;
        if sql.query.starts_with("INSERT") {
            self.insert(sql)
        } else if sql.query.starts_with("UPDATE") {
            self.update(sql)
        } else if sql.query.starts_with("DELETE") {
            self.delete(sql)
        } else {
            Err(unsupported(sql))
        }
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Left-to-right evaluation of `col<op>?` terms joined by AND / OR, plus `id IN (?, ...)`
fn matches(row: &Row, where_clause: &str, params: &[Value]) -> bool {
    if where_clause.is_empty() {
        return true;
    }
    if let Some((column, _)) = where_clause.split_once(" IN (") {
        let value = row.get(column);
        return params.iter().any(|p| compare(value, p) == Some(Ordering::Equal));
    }

    let mut result = true;
    let mut conjunction = "AND";
    let mut params = params.iter();
    for (i, token) in where_clause.split(' ').enumerate() {
        if token == "AND" || token == "OR" {
            conjunction = token;
            continue;
        }
        let Some(param) = params.next() else {
            return false;
        };
        let term = evaluate_term(row, token, param);
        result = if i == 0 {
            term
        } else if conjunction == "OR" {
            result || term
        } else {
            result && term
        };
    }
    result
}

fn evaluate_term(row: &Row, term: &str, param: &Value) -> bool {
    let term = term.trim_end_matches('?');
    for op in ["!=", "<=", ">=", "<", ">", "="] {
        if let Some(column) = term.strip_suffix(op) {
            let Some(ordering) = compare(row.get(column), param) else {
                return false;
            };
            return match op {
                "!=" => ordering != Ordering::Equal,
                "<=" => ordering != Ordering::Greater,
                ">=" => ordering != Ordering::Less,
                "<" => ordering == Ordering::Less,
                ">" => ordering == Ordering::Greater,
                _ => ordering == Ordering::Equal,
            };
        }
    }
    false
}

/// Numeric when both sides are numbers, textual otherwise; NULL compares to nothing
fn compare(value: Option<&Value>, param: &Value) -> Option<Ordering> {
    let left = text(value?)?;
    let right = text(param)?;
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r),
        _ => Some(left.cmp(&right)),
    }
}

fn sort_rows(rows: &mut [Row], order: &str) {
    let mut parts = order.split(',').next().unwrap_or("").split_whitespace();
    let column = parts.next().unwrap_or("").to_string();
    let descending = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
    rows.sort_by(|a, b| {
        let ordering = b
            .get(&column)
            .and_then(|bv| compare(a.get(&column), bv))
            .unwrap_or(Ordering::Equal);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        other => Some(other.to_string()),
    }
}

fn int(value: Option<&Value>) -> i64 {
    value.and_then(text).and_then(|t| t.parse().ok()).unwrap_or(0)
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("test rows must be JSON objects, got {}", other),
    }
}

fn unsupported(sql: &SqlResult) -> DatabaseError {
    DatabaseError::QueryError(format!("MemoryDatabase cannot run: {}", sql.query))
}

fn missing_table(table: &str) -> DatabaseError {
    DatabaseError::QueryError(format!("Table '{}' doesn't exist", table))
}

/// `products(id, name, price)` with Lamp (25), Desk (120) and Pen (2)
pub fn products_db() -> MemoryDatabase {
    MemoryDatabase::new()
        .with_table("products", &["id", "name", "price"])
        .with_rows(
            "products",
            vec![
                serde_json::json!({"id": 1, "name": "Lamp", "price": 25}),
                serde_json::json!({"id": 2, "name": "Desk", "price": 120}),
                serde_json::json!({"id": 3, "name": "Pen", "price": 2}),
            ],
        )
}

/// Tokens resolved from a fixed map
#[derive(Debug, Default, Clone)]
pub struct StaticTokenStore {
    tokens: HashMap<String, CallerIdentity>,
}

impl StaticTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, caller: CallerIdentity) -> Self {
        self.tokens.insert(token.to_string(), caller);
        self
    }
}

#[async_trait]
impl TokenStore for StaticTokenStore {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, TokenError> {
        self.tokens.get(token).cloned().ok_or(TokenError::Unknown)
    }
}

/// Passes payloads through unchanged and keeps a copy of each
#[derive(Debug, Default)]
pub struct RecordingHook {
    seen: Mutex<Vec<HookPayload>>,
}

impl RecordingHook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<HookPayload> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Hook for RecordingHook {
    async fn call(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        self.seen.lock().unwrap().push(payload.clone());
        Ok(payload)
    }
}

/// A temporary modules directory holding `<table>/assets/api.json` documents
pub struct DescriptorFixture {
    dir: TempDir,
}

impl DescriptorFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, table: &str, document: Value) {
        self.write_raw(table, &serde_json::to_string_pretty(&document).unwrap());
    }

    pub fn write_raw(&self, table: &str, contents: &str) {
        let assets = self.dir.path().join(table).join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("api.json"), contents).unwrap();
    }
}

/// Development config pointing at the fixture, with `admin-token` resolving to an admin
pub fn test_state(db: MemoryDatabase, fixture: &DescriptorFixture, hooks: HookRegistry) -> AppState {
    let mut config = AppConfig::development();
    config.endpoints.modules_dir = fixture.path().to_path_buf();

    let tokens = StaticTokenStore::new().with(
        "admin-token",
        CallerIdentity {
            user_id: 1,
            user_level: "admin".into(),
            user_code: "adm".into(),
        },
    );

    AppState {
        db: Arc::new(db),
        tokens: Arc::new(tokens),
        descriptors: DescriptorStore::new(fixture.path()),
        hooks: Arc::new(hooks),
        config: Arc::new(config),
    }
}

/// Context for `path` (which may carry `?query`) sent with `method`
pub fn request_context(method: RequestType, path: &str, token: Option<&str>) -> RequestContext {
    request_with_body(method, path, token, "")
}

pub fn request_with_body(method: RequestType, path: &str, token: Option<&str>, body: &str) -> RequestContext {
    let (path, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert("trongatetoken", HeaderValue::from_str(token).unwrap());
    }
    let method = Method::from_bytes(method.as_str().as_bytes()).unwrap();
    RequestContext::build(&method, path, query, &headers, "trongateToken", Bytes::from(body.to_string())).unwrap()
}

/// Run one executor against `db` with params enabled and no hooks or authorization
pub async fn run_endpoint(
    db: &MemoryDatabase,
    method: RequestType,
    path: &str,
    query: &str,
    params: Value,
) -> Result<Value, ApiError> {
    let mut ctx = request_context(method, path, None);
    ctx.query = query.to_string();

    let descriptor: EndpointDescriptor = serde_json::from_value(serde_json::json!({
        "request_type": method.as_str(),
        "authorization": "*",
        "enableParams": true
    }))
    .unwrap();

    let table = ValidatedTable::load(db, &ctx.table).await?;
    let input = InputBundle {
        token: None,
        table: ctx.table.clone(),
        endpoint: ctx.endpoint.name().to_string(),
        params,
        query: ctx.query.clone(),
    };

    executors::execute(&Execution {
        db,
        table: &table,
        descriptor: &descriptor,
        ctx: &ctx,
        input: &input,
    })
    .await
}
