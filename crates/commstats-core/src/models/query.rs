//! Query shapes shared by every collection store.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One record of a remote collection.
pub type Row = Map<String, Value>;

/// A single column predicate, rendered in PostgREST operator syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum Filter {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    IsNull,
}

impl Filter {
    /// Render as `op.value`, e.g. `eq.42` or `in.(a,b)`.
    pub fn render(&self) -> String {
        match self {
            Filter::Eq(v) => format!("eq.{}", render_value(v)),
            Filter::Neq(v) => format!("neq.{}", render_value(v)),
            Filter::Gt(v) => format!("gt.{}", render_value(v)),
            Filter::Gte(v) => format!("gte.{}", render_value(v)),
            Filter::Lt(v) => format!("lt.{}", render_value(v)),
            Filter::Lte(v) => format!("lte.{}", render_value(v)),
            Filter::In(values) => {
                let inner: Vec<String> = values.iter().map(render_value).collect();
                format!("in.({})", inner.join(","))
            }
            Filter::IsNull => "is.null".to_string(),
        }
    }

    /// Evaluate against a column value (`None` when the column is absent).
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let actual = match actual {
            Some(Value::Null) | None => return matches!(self, Filter::IsNull),
            Some(value) => value,
        };

        match self {
            Filter::Eq(v) => compare_values(actual, v) == Some(Ordering::Equal),
            Filter::Neq(v) => compare_values(actual, v) != Some(Ordering::Equal),
            Filter::Gt(v) => compare_values(actual, v) == Some(Ordering::Greater),
            Filter::Gte(v) => matches!(
                compare_values(actual, v),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(v) => compare_values(actual, v) == Some(Ordering::Less),
            Filter::Lte(v) => matches!(
                compare_values(actual, v),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(values) => values
                .iter()
                .any(|v| compare_values(actual, v) == Some(Ordering::Equal)),
            Filter::IsNull => false,
        }
    }
}

/// Column predicates combined with AND.
///
/// Stored ordered by column so that two equal sets render identically no
/// matter how they were built. One predicate per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    filters: BTreeMap<String, Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the predicate for a column.
    pub fn filter(mut self, column: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(column.into(), filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Filter::Eq(value.into()))
    }

    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Filter::Gte(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Filter)> {
        self.filters.iter()
    }

    /// Query-string pairs in column order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|(column, filter)| (column.clone(), filter.render()))
            .collect()
    }

    /// Canonical `col=op.value&...` form.
    pub fn render(&self) -> String {
        self.to_query_pairs()
            .into_iter()
            .map(|(column, filter)| format!("{}={}", column, filter))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// True if every predicate holds for the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, filter)| filter.matches(row.get(column)))
    }
}

/// Ordering for a collection read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Options for a collection read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Columns to read; empty reads every column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first by the given timestamp column.
    pub fn newest_first(column: impl Into<String>) -> Self {
        Self {
            order_by: Some(OrderBy {
                column: column.into(),
                ascending: false,
            }),
            ..Self::default()
        }
    }

    /// Ascending by the given column.
    pub fn ascending_by(column: impl Into<String>) -> Self {
        Self {
            order_by: Some(OrderBy {
                column: column.into(),
                ascending: true,
            }),
            ..Self::default()
        }
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// PostgREST `select` value: `*` or a comma-separated column list.
    pub fn select(&self) -> String {
        if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Rows returned by a collection read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

/// Render a filter value the way PostgREST expects it in a query string.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Compare two column values.
///
/// Numbers compare numerically, RFC 3339 timestamps chronologically, and
/// everything else by rendered text. Ids stored as numbers still match a
/// filter written with a numeric string.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }

    let (left, right) = (render_value(a), render_value(b));
    if let (Ok(x), Ok(y)) = (
        DateTime::parse_from_rfc3339(&left),
        DateTime::parse_from_rfc3339(&right),
    ) {
        return Some(x.cmp(&y));
    }

    Some(left.cmp(&right))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}
