//! Identifier validation gate.
//!
//! Table and column names cannot be bound as parameters, so they are spliced into SQL text.
//! `ValidatedTable` is only obtainable by checking a name against the live table list and
//! loading its columns; every SQL renderer takes one, and every column it renders is looked
//! up on it first.

use thiserror::Error;

use super::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid table name: {0}")]
    UnknownTable(String),

    #[error("Invalid column name(s): {}", .0.join(", "))]
    UnknownColumns(Vec<String>),

    #[error("Invalid order by clause: {0}")]
    InvalidOrderBy(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A table name confirmed to exist, together with its column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable {
    name: String,
    columns: Vec<String>,
}

impl ValidatedTable {
    /// Check `name` against `SHOW TABLES`, then load its columns with `DESCRIBE`
    pub async fn load(db: &dyn Database, name: &str) -> Result<Self, SchemaError> {
        if !is_identifier(name) {
            return Err(SchemaError::UnknownTable(name.to_string()));
        }

        let tables = db.list_tables().await?;
        let Some(name) = tables.into_iter().find(|t| t == name) else {
            tracing::debug!("Rejected unknown table '{}'", name);
            return Err(SchemaError::UnknownTable(name.to_string()));
        };

        let columns = db.describe_table(&name).await?;
        Ok(Self { name, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Return the column name if the table has it
    pub fn column<'a>(&self, column: &'a str) -> Result<&'a str, SchemaError> {
        if self.has_column(column) {
            Ok(column)
        } else {
            Err(SchemaError::UnknownColumns(vec![column.to_string()]))
        }
    }

    /// Fail with every offending name at once, in input order
    pub fn require_columns<'a, I>(&self, columns: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut unknown: Vec<String> = Vec::new();
        for column in columns {
            if !self.has_column(column) && !unknown.iter().any(|u| u == column) {
                unknown.push(column.to_string());
            }
        }
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::UnknownColumns(unknown))
        }
    }

    /// Accepts `col [ASC|DESC][, col [ASC|DESC]...]` over known columns. Returns the clause
    /// trimmed but otherwise verbatim.
    pub fn order_by<'a>(&self, raw: &'a str) -> Result<&'a str, SchemaError> {
        let raw = raw.trim();
        for part in raw.split(',') {
            let mut tokens = part.split_whitespace();
            let column = tokens
                .next()
                .ok_or_else(|| SchemaError::InvalidOrderBy(raw.to_string()))?;
            self.column(column)?;

            match tokens.next() {
                None => {}
                Some(dir) if dir.eq_ignore_ascii_case("asc") || dir.eq_ignore_ascii_case("desc") => {}
                Some(_) => return Err(SchemaError::InvalidOrderBy(raw.to_string())),
            }
            if tokens.next().is_some() {
                return Err(SchemaError::InvalidOrderBy(raw.to_string()));
            }
        }
        Ok(raw)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Cheap syntactic pre-check; names that fail it cannot exist in the table list anyway
fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
