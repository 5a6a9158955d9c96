pub mod error;
pub mod json_body;
pub mod query_string;
pub mod types;

pub use error::FilterError;
pub use json_body::{parse_json_body, parse_json_bytes};
pub use query_string::parse_query_string;
pub use types::*;
