use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::info;

use super::DatabaseError;
use crate::config::DatabaseConfig;

/// Builds and owns the MySQL connection pool
pub struct DatabaseManager {
    pool: MySqlPool,
}

impl DatabaseManager {
    /// Connect using `DATABASE_URL` and the pool settings from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(
            "Created database pool for {} (max {} connections)",
            redact(url),
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}

/// Strip credentials before a connection string reaches the log
fn redact(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable DATABASE_URL>".to_string(),
    }
}
