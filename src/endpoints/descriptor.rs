use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// HTTP verbs an endpoint descriptor can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Get,
    Post,
    Put,
    Delete,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Get => "GET",
            RequestType::Post => "POST",
            RequestType::Put => "PUT",
            RequestType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestType::Get),
            "POST" => Ok(RequestType::Post),
            "PUT" => Ok(RequestType::Put),
            "DELETE" => Ok(RequestType::Delete),
            other => Err(format!("Unsupported request type: {}", other)),
        }
    }
}

impl<'de> Deserialize<'de> for RequestType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Row ownership rule: the row whose `column` equals URL segment `segment_num`
/// must belong to the caller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserOwnedSegment {
    pub column: String,
    #[serde(rename = "segmentNum", deserialize_with = "segment_index")]
    pub segment_num: usize,
}

/// Structured authorization rules. Any matching rule admits the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPolicy {
    #[serde(default, deserialize_with = "string_set")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "string_set")]
    pub user_ids: Vec<String>,
    #[serde(default, deserialize_with = "optional_segment_index")]
    pub user_id_segment: Option<usize>,
    #[serde(default, deserialize_with = "optional_segment_index")]
    pub user_code_segment: Option<usize>,
    #[serde(default)]
    pub user_owned_segment: Option<UserOwnedSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAuthorization")]
pub enum Authorization {
    /// `"*"`: open to any caller, token or not
    Wildcard,
    Policy(AuthorizationPolicy),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAuthorization {
    Text(String),
    Policy(AuthorizationPolicy),
}

impl TryFrom<RawAuthorization> for Authorization {
    type Error = String;

    fn try_from(raw: RawAuthorization) -> Result<Self, Self::Error> {
        match raw {
            RawAuthorization::Text(s) if s.trim() == "*" => Ok(Authorization::Wildcard),
            RawAuthorization::Text(s) => Err(format!("Unsupported authorization value: {:?}", s)),
            RawAuthorization::Policy(policy) => Ok(Authorization::Policy(policy)),
        }
    }
}

/// Rules for one logical endpoint on one table, as read from the table's `api.json`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointDescriptor {
    pub request_type: RequestType,

    /// Informational: dispatch goes by URL shape and never reads it. Filled from the
    /// built-in endpoint table when the document leaves it out, for `endpoints check`.
    #[serde(default)]
    pub restful_identifier: Option<String>,

    /// `None` when the document has no `authorization` key: the endpoint is not activated
    #[serde(default)]
    pub authorization: Option<Authorization>,

    #[serde(rename = "beforeHook", default, deserialize_with = "hook_name")]
    pub before_hook: Option<String>,

    #[serde(rename = "afterHook", default, deserialize_with = "hook_name")]
    pub after_hook: Option<String>,

    #[serde(rename = "enableParams", default)]
    pub enable_params: bool,
}

/// Scalars or arrays of scalars, normalized to strings (`userIds` are often numbers)
fn string_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        scalar => vec![scalar],
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!("Expected a string or number, got {}", other))),
        })
        .collect()
}

fn segment_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_segment_index(&value).ok_or_else(|| serde::de::Error::custom(format!("Invalid segment number: {}", value)))
}

fn optional_segment_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    parse_segment_index(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid segment number: {}", value)))
}

fn parse_segment_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Empty hook names mean no hook
fn hook_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()))
}
