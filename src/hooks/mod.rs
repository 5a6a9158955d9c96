//! Before/after hooks.
//!
//! Endpoint documents name hooks as `module/method`. The registry maps those names to
//! `Hook` implementations registered at startup; every hook has the same call shape and
//! receives the payload by value, handing back the (possibly modified) payload.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Request data handed to a before hook
#[derive(Debug, Clone, PartialEq)]
pub struct InputBundle {
    pub token: Option<String>,
    pub table: String,
    pub endpoint: String,
    /// Decoded JSON body, `Null` when there is none
    pub params: Value,
    /// Raw query string
    pub query: String,
}

/// Response data handed to an after hook. Only these three fields reach the client.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBundle {
    pub body: Value,
    pub code: u16,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookPayload {
    Input(InputBundle),
    Output(OutputBundle),
}

impl HookPayload {
    fn kind(&self) -> &'static str {
        match self {
            HookPayload::Input(_) => "input",
            HookPayload::Output(_) => "output",
        }
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Unknown hook: {0}")]
    Unknown(String),

    #[error("Hook {name} returned an {returned} payload, expected {expected}")]
    PayloadMismatch {
        name: String,
        expected: &'static str,
        returned: &'static str,
    },

    /// The hook refused the request
    #[error("{0}")]
    Rejected(String),

    #[error("Hook failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, payload: HookPayload) -> Result<HookPayload, HookError>;
}

/// Adapter so plain closures can be registered
pub struct FnHook<F>(F);

impl<F> FnHook<F>
where
    F: Fn(HookPayload) -> Result<HookPayload, HookError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(HookPayload) -> Result<HookPayload, HookError> + Send + Sync,
{
    async fn call(&self, payload: HookPayload) -> Result<HookPayload, HookError> {
        (self.0)(payload)
    }
}

#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.hooks.keys().collect();
        names.sort();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under `module/method`
    pub fn register(&mut self, name: impl Into<String>, hook: Arc<dyn Hook>) -> &mut Self {
        self.hooks.insert(normalize_name(&name.into()), hook);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(&normalize_name(name))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn before(&self, name: &str, input: InputBundle) -> Result<InputBundle, HookError> {
        match self.invoke(name, HookPayload::Input(input)).await? {
            HookPayload::Input(input) => Ok(input),
            other => Err(mismatch(name, "input", &other)),
        }
    }

    pub async fn after(&self, name: &str, output: OutputBundle) -> Result<OutputBundle, HookError> {
        match self.invoke(name, HookPayload::Output(output)).await? {
            HookPayload::Output(output) => Ok(output),
            other => Err(mismatch(name, "output", &other)),
        }
    }

    async fn invoke(&self, name: &str, payload: HookPayload) -> Result<HookPayload, HookError> {
        let hook = self
            .hooks
            .get(&normalize_name(name))
            .ok_or_else(|| HookError::Unknown(name.to_string()))?;
        tracing::debug!("Invoking hook {} with {} payload", name, payload.kind());
        hook.call(payload).await
    }
}

fn mismatch(name: &str, expected: &'static str, returned: &HookPayload) -> HookError {
    HookError::PayloadMismatch {
        name: name.to_string(),
        expected,
        returned: returned.kind(),
    }
}

/// `Tasks/_before_get` and `tasks/_before_get` name the same hook
fn normalize_name(name: &str) -> String {
    name.trim().trim_matches('/').to_ascii_lowercase()
}
