use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::database::{Database, DatabaseError, Row, SqlResult};

/// The user behind a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: i64,
    pub user_level: String,
    pub user_code: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token not recognised")]
    Unknown,

    #[error("Token expired")]
    Expired,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Resolves bearer tokens to caller identities
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, TokenError>;
}

const TOKEN_QUERY: &str = "SELECT trongate_tokens.user_id, trongate_tokens.expiry_date, \
     trongate_users.code AS user_code, trongate_user_levels.level_title AS user_level \
     FROM trongate_tokens \
     INNER JOIN trongate_users ON trongate_tokens.user_id = trongate_users.id \
     INNER JOIN trongate_user_levels ON trongate_users.user_level_id = trongate_user_levels.id \
     WHERE trongate_tokens.token=?";

/// Token lookup over the `trongate_tokens`, `trongate_users` and `trongate_user_levels`
/// tables. `expiry_date` is a unix timestamp.
pub struct MySqlTokenStore {
    db: Arc<dyn Database>,
}

impl MySqlTokenStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for MySqlTokenStore {
    async fn resolve(&self, token: &str) -> Result<CallerIdentity, TokenError> {
        let sql = SqlResult::new(TOKEN_QUERY, vec![Value::String(token.to_string())]);
        let rows = self.db.fetch_all(&sql).await?;
        let row = rows.into_iter().next().ok_or(TokenError::Unknown)?;

        let expiry = int_field(&row, "expiry_date");
        if expiry <= chrono::Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(CallerIdentity {
            user_id: int_field(&row, "user_id"),
            user_level: text_field(&row, "user_level"),
            user_code: text_field(&row, "user_code"),
        })
    }
}

/// Integer coercion used for ids and timestamps: numbers, numeric strings, else 0
pub(crate) fn as_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

fn int_field(row: &Row, key: &str) -> i64 {
    as_int(row.get(key))
}

fn text_field(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Short SHA-256 prefix of a token, safe to log
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}
