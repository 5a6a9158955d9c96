use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators supported by the filter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "=")] Eq,
    #[serde(rename = "!=")] Neq,
    #[serde(rename = "<")] Lt,
    #[serde(rename = ">")] Gt,
    #[serde(rename = "<=")] Lte,
    #[serde(rename = ">=")] Gte,
}

impl FilterOp {
    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Gt => ">",
            FilterOp::Lte => "<=",
            FilterOp::Gte => ">=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// One `column operator value` triple. The conjunction joins it to the previous condition
/// and is never rendered for the first condition of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: FilterOp,
    pub value: String,
    pub conjunction: Conjunction,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, operator: FilterOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            conjunction: Conjunction::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.conjunction = Conjunction::Or;
        self
    }
}

/// Parsed filter conditions plus the reserved control directives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    pub conditions: Vec<FilterCondition>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.order_by.is_none() && self.limit.is_none() && self.offset.is_none()
    }
}

/// Control keys that are never treated as filter columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    OrderBy,
    Limit,
    Offset,
}

impl Directive {
    /// Matches on the first whitespace token of a key
    pub(crate) fn from_key(key: &str) -> Option<Self> {
        let token = key.split_whitespace().next()?;
        match token {
            "orderBy" | "order_by" => Some(Directive::OrderBy),
            t if t.eq_ignore_ascii_case("limit") => Some(Directive::Limit),
            t if t.eq_ignore_ascii_case("offset") => Some(Directive::Offset),
            _ => None,
        }
    }
}

/// Strip a leading `OR `/`or ` marker from a key
pub(crate) fn split_conjunction(key: &str) -> (Conjunction, &str) {
    let trimmed = key.trim_start();
    for prefix in ["OR ", "or "] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (Conjunction::Or, rest.trim());
        }
    }
    (Conjunction::And, trimmed.trim())
}

impl FilterSet {
    pub(crate) fn apply_directive(&mut self, directive: Directive, value: &str) {
        let value = value.trim();
        match directive {
            Directive::OrderBy => {
                if !value.is_empty() {
                    self.order_by = Some(value.to_string());
                }
            }
            Directive::Limit => {
                if let Ok(n) = value.parse::<u64>() {
                    self.limit = Some(n);
                }
            }
            Directive::Offset => {
                if let Ok(n) = value.parse::<u64>() {
                    self.offset = Some(n);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_match_first_token_only() {
        assert_eq!(Directive::from_key("orderBy"), Some(Directive::OrderBy));
        assert_eq!(Directive::from_key("order_by desc"), Some(Directive::OrderBy));
        assert_eq!(Directive::from_key("LIMIT"), Some(Directive::Limit));
        assert_eq!(Directive::from_key("Offset"), Some(Directive::Offset));
        assert_eq!(Directive::from_key("OrderBy"), None);
        assert_eq!(Directive::from_key("limits"), None);
        assert_eq!(Directive::from_key("price"), None);
    }

    #[test]
    fn conjunction_prefix_is_stripped() {
        assert_eq!(split_conjunction("OR name"), (Conjunction::Or, "name"));
        assert_eq!(split_conjunction("or  name >"), (Conjunction::Or, "name >"));
        assert_eq!(split_conjunction("ORDER"), (Conjunction::And, "ORDER"));
        assert_eq!(split_conjunction(" name "), (Conjunction::And, "name"));
    }

    #[test]
    fn non_numeric_limit_is_ignored() {
        let mut set = FilterSet::default();
        set.apply_directive(Directive::Limit, "ten");
        set.apply_directive(Directive::Offset, "-1");
        assert_eq!(set.limit, None);
        assert_eq!(set.offset, None);
        set.apply_directive(Directive::Limit, " 25 ");
        assert_eq!(set.limit, Some(25));
    }
}
