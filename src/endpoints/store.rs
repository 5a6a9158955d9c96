use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::descriptor::EndpointDescriptor;
use super::resolver::EndpointKind;

/// Legacy key some documents use for the POST search endpoint
const SEARCH_FALLBACK: &str = "Get By Post";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("No endpoint settings for '{0}'")]
    NotFound(String),

    #[error("Invalid endpoint settings in {path}: {reason}")]
    Invalid { path: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads `<modules_dir>/<table>/assets/api.json`. Nothing is cached: every call goes
/// back to the file.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    modules_dir: PathBuf,
}

impl DescriptorStore {
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self { modules_dir: modules_dir.into() }
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    pub fn document_path(&self, table: &str) -> PathBuf {
        self.modules_dir.join(table).join("assets").join("api.json")
    }

    /// Every descriptor in the table's document
    pub async fn load(&self, table: &str) -> Result<BTreeMap<String, EndpointDescriptor>, DescriptorError> {
        let (path, document) = self.read_document(table).await?;
        document
            .into_iter()
            .map(|(name, entry)| {
                let descriptor = parse_entry(&path, &name, entry)?;
                Ok((name, descriptor))
            })
            .collect()
    }

    /// The descriptor for one built-in endpoint, with `restful_identifier` defaulted.
    /// `Search` falls back to `Get By Post`.
    pub async fn descriptor(&self, table: &str, kind: EndpointKind) -> Result<EndpointDescriptor, DescriptorError> {
        let (path, mut document) = self.read_document(table).await?;

        let name = kind.name();
        let entry = match document.remove(name) {
            Some(entry) => entry,
            None if kind == EndpointKind::Search => document
                .remove(SEARCH_FALLBACK)
                .ok_or_else(|| DescriptorError::NotFound(format!("{}/{}", table, name)))?,
            None => return Err(DescriptorError::NotFound(format!("{}/{}", table, name))),
        };

        let mut descriptor = parse_entry(&path, name, entry)?;
        if descriptor.restful_identifier.is_none() {
            descriptor.restful_identifier = Some(kind.standard().restful_identifier.to_string());
        }
        Ok(descriptor)
    }

    async fn read_document(&self, table: &str) -> Result<(String, Map<String, Value>), DescriptorError> {
        // Table names become path components
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DescriptorError::NotFound(table.to_string()));
        }

        let path = self.document_path(table);
        let display = path.display().to_string();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DescriptorError::NotFound(table.to_string()));
            }
            Err(source) => return Err(DescriptorError::Io { path: display, source }),
        };

        let document: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|e| DescriptorError::Invalid {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        Ok((display, document))
    }
}

fn parse_entry(path: &str, name: &str, entry: Value) -> Result<EndpointDescriptor, DescriptorError> {
    serde_json::from_value(entry).map_err(|e| DescriptorError::Invalid {
        path: path.to_string(),
        reason: format!("{}: {}", name, e),
    })
}
