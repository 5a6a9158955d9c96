use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Filter body must be a JSON object")]
    NotAnObject,

    #[error("Unsupported value for '{0}': filter values must be strings, numbers or booleans")]
    UnsupportedValue(String),

    #[error("Empty column name in filter key '{0}'")]
    EmptyColumn(String),
}
