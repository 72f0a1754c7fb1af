//! Duplicate-row removal for collections read from an untrusted store.

use crate::models::Row;
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;

/// Unique rows and how many duplicates were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduped<T> {
    pub unique: Vec<T>,
    pub duplicate_count: usize,
}

impl<T> Deduped<T> {
    pub fn has_duplicates(&self) -> bool {
        self.duplicate_count > 0
    }
}

/// Keep the first row per identity, preserving first-seen order.
pub fn dedupe<T, K, F>(rows: Vec<T>, identity: F) -> Deduped<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<T> = rows
        .into_iter()
        .filter(|row| seen.insert(identity(row)))
        .collect();

    Deduped {
        duplicate_count: total - unique.len(),
        unique,
    }
}

/// Canonical text for a key value, or `None` for null.
///
/// Integral numbers render without a fraction, so `1`, `1.0` and `"1"` agree.
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_key(n)),
        other => Some(other.to_string()),
    }
}

fn number_key(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Identity of a store row: its `id` column, or the whole row when it has none.
pub fn row_identity(row: &Row) -> String {
    row.get("id")
        .and_then(value_key)
        .unwrap_or_else(|| Value::Object(row.clone()).to_string())
}

/// Deduplicate store rows by [`row_identity`].
pub fn dedupe_rows(rows: Vec<Row>) -> Deduped<Row> {
    dedupe(rows, row_identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_keeps_first_seen() {
        let input = rows(json!([
            {"id": 1, "name": "A"},
            {"id": 2, "name": "B"},
            {"id": 1, "name": "A (late copy)"},
        ]));
        let result = dedupe_rows(input);

        assert_eq!(result.unique.len(), 2);
        assert_eq!(result.unique[0]["name"], json!("A"));
        assert_eq!(result.unique[1]["name"], json!("B"));
        assert_eq!(result.duplicate_count, 1);
        assert!(result.has_duplicates());
    }

    #[test]
    fn test_empty_input() {
        let result = dedupe(Vec::<u32>::new(), |v| *v);
        assert!(result.unique.is_empty());
        assert_eq!(result.duplicate_count, 0);
        assert!(!result.has_duplicates());
    }

    #[test]
    fn test_idempotent() {
        let input = vec![3, 1, 3, 2, 1, 3];
        let once = dedupe(input, |v| *v);
        let twice = dedupe(once.unique.clone(), |v| *v);

        assert_eq!(once.unique, vec![3, 1, 2]);
        assert_eq!(once.duplicate_count, 3);
        assert_eq!(twice.unique, once.unique);
        assert_eq!(twice.duplicate_count, 0);
    }

    #[test]
    fn test_string_and_numeric_ids() {
        let a = json!({"id": "7"}).as_object().cloned().unwrap();
        let b = json!({"id": 7}).as_object().cloned().unwrap();
        assert_eq!(row_identity(&a), row_identity(&b));
    }

    #[test]
    fn test_integral_float_ids_match() {
        let input = rows(json!([
            {"id": 1, "name": "int"},
            {"id": 1.0, "name": "float"},
            {"id": "1", "name": "text"},
            {"id": 1.5, "name": "fraction"},
        ]));
        let result = dedupe_rows(input);

        assert_eq!(result.unique.len(), 2);
        assert_eq!(result.unique[0]["name"], json!("int"));
        assert_eq!(result.unique[1]["name"], json!("fraction"));
        assert_eq!(value_key(&json!(-3.0)), Some("-3".to_string()));
        assert_eq!(value_key(&Value::Null), None);
    }

    #[test]
    fn test_rows_without_id_use_content() {
        let input = rows(json!([
            {"name": "x"},
            {"name": "x"},
            {"name": "y"},
        ]));
        let result = dedupe_rows(input);
        assert_eq!(result.unique.len(), 2);
        assert_eq!(result.duplicate_count, 1);
    }
}
