pub mod manager;
pub mod mysql;
pub mod query_builder;
pub mod schema;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use manager::DatabaseManager;
pub use mysql::MySqlDatabase;
pub use query_builder::{build, QueryBuilder, SqlResult};
pub use schema::{SchemaError, ValidatedTable};

/// A result row keyed by column name
pub type Row = Map<String, Value>;

/// Errors from the database collaborator
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// The relational engine the endpoint engine talks to. Implementations receive fully
/// rendered SQL with `?` placeholders and the positional parameters to bind.
#[async_trait]
pub trait Database: Send + Sync {
    /// Names of all tables (`SHOW TABLES`)
    async fn list_tables(&self) -> Result<Vec<String>, DatabaseError>;

    /// Column names of one table (`DESCRIBE <table>`). Callers pass only names that
    /// appeared in `list_tables`.
    async fn describe_table(&self, table: &str) -> Result<Vec<String>, DatabaseError>;

    async fn fetch_all(&self, sql: &SqlResult) -> Result<Vec<Row>, DatabaseError>;

    async fn execute(&self, sql: &SqlResult) -> Result<ExecResult, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
