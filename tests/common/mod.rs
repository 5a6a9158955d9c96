#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use trongate_api::auth::MySqlTokenStore;
use trongate_api::config::AppConfig;
use trongate_api::database::{Database, DatabaseError, ExecResult, Row, SqlResult};
use trongate_api::endpoints::DescriptorStore;
use trongate_api::hooks::HookRegistry;
use trongate_api::server::{app, AppState};

/// Database stand-in: one table with fixed rows, every statement recorded.
/// `SELECT * FROM <table>` returns all rows, `... WHERE id=?` the matching one,
/// anything else returns nothing.
pub struct FixtureDatabase {
    table: String,
    columns: Vec<String>,
    rows: Vec<Row>,
    statements: Mutex<Vec<SqlResult>>,
}

impl FixtureDatabase {
    pub fn products() -> Arc<Self> {
        let rows = [
            json!({"id": 1, "name": "Lamp", "price": 25}),
            json!({"id": 2, "name": "Desk", "price": 120}),
            json!({"id": 3, "name": "Pen", "price": 2}),
        ];
        Arc::new(Self {
            table: "products".into(),
            columns: vec!["id".into(), "name".into(), "price".into()],
            rows: rows
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn statements(&self) -> Vec<SqlResult> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, sql: &SqlResult) {
        self.statements.lock().unwrap().push(sql.clone());
    }
}

#[async_trait]
impl Database for FixtureDatabase {
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        Ok(vec![self.table.clone()])
    }

    async fn describe_table(&self, _table: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self.columns.clone())
    }

    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError> {
        self.record(sql);
        let select_all = format!("SELECT * FROM {}", self.table);
        if !sql.query.starts_with(&select_all) {
            return Ok(Vec::new());
        }
        if sql.query.ends_with("WHERE id=?") {
            let id = sql.params.first().cloned().unwrap_or(Value::Null);
            return Ok(self.rows.iter().filter(|r| r.get("id") == Some(&id)).cloned().collect());
        }
        Ok(self.rows.clone())
    }

    async fn execute(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError> {
        self.record(sql);
        Ok(ExecResult { rows_affected: 1, last_insert_id: 4 })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// A modules directory holding `<table>/assets/api.json` documents
pub struct Modules {
    dir: TempDir,
}

impl Modules {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, table: &str, document: Value) -> &Self {
        let assets = self.dir.path().join(table).join("assets");
        std::fs::create_dir_all(&assets).expect("create assets dir");
        std::fs::write(assets.join("api.json"), document.to_string()).expect("write api.json");
        self
    }
}

pub struct TestServer {
    pub base_url: String,
    pub db: Arc<FixtureDatabase>,
    _modules: Modules,
}

/// Serve the router on a free local port for the lifetime of the current test runtime
pub async fn spawn_server(db: Arc<FixtureDatabase>, modules: Modules) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let state = AppState {
        db: db.clone(),
        tokens: Arc::new(MySqlTokenStore::new(db.clone())),
        descriptors: DescriptorStore::new(modules.path()),
        hooks: Arc::new(HookRegistry::new()),
        config: Arc::new(AppConfig::development()),
    };

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    let server = TestServer { base_url, db, _modules: modules };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}
