//! URL query-string filter grammar.
//!
//! Each `&`-separated pair carries its comparison operator in the delimiter between key and
//! value, usually percent-encoded by clients (`price%3E=10` is `price >= 10`).

use url::form_urlencoded;

use super::types::{split_conjunction, Directive, FilterCondition, FilterOp, FilterSet};

/// Operator delimiters in priority order: `(operator, encoded form, plain form)`.
/// The first operator whose delimiter appears in a raw pair wins, encoded form first.
const DELIMITERS: [(FilterOp, Option<&str>, &str); 6] = [
    (FilterOp::Neq, Some("%21="), "!="),
    (FilterOp::Lte, Some("%3C="), "<="),
    (FilterOp::Gte, Some("%3E="), ">="),
    (FilterOp::Lt, Some("%3C"), "<"),
    (FilterOp::Gt, Some("%3E"), ">"),
    (FilterOp::Eq, None, "="),
];

/// Parse a raw (still percent-encoded) query string into an ordered filter set.
pub fn parse_query_string(raw: &str) -> FilterSet {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut set = FilterSet::default();

    for pair in raw.split('&').filter(|p| !p.is_empty()) {
        let Some((operator, raw_key, raw_value)) = split_pair(pair) else {
            tracing::trace!("Ignoring query pair without operator: {}", pair);
            continue;
        };

        let key = decode_component(raw_key);
        let value = decode_component(raw_value);

        if let Some(directive) = Directive::from_key(&key) {
            set.apply_directive(directive, &value);
            continue;
        }

        let (conjunction, column) = split_conjunction(&key);
        if column.is_empty() {
            continue;
        }

        set.conditions.push(FilterCondition {
            column: column.to_string(),
            operator,
            value,
            conjunction,
        });
    }

    set
}

/// Split one raw pair on the highest priority operator delimiter it contains
fn split_pair(pair: &str) -> Option<(FilterOp, &str, &str)> {
    // ASCII uppercasing keeps byte offsets intact, so positions map back onto `pair`
    let upper = pair.to_ascii_uppercase();

    for (operator, encoded, plain) in DELIMITERS {
        let found = encoded
            .and_then(|e| upper.find(e).map(|pos| (pos, e.len())))
            .or_else(|| pair.find(plain).map(|pos| (pos, plain.len())));

        if let Some((pos, len)) = found {
            return Some((operator, &pair[..pos], &pair[pos + len..]));
        }
    }
    None
}

/// Form-decode a single key or value component (`+` is a space, `%XX` escapes)
fn decode_component(component: &str) -> String {
    // form_urlencoded splits on the first '=', so a dummy name keeps '=' inside the value
    form_urlencoded::parse(format!("_={}", component).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
