//! In-memory collection store for local development and tests.

use super::CollectionStore;
use crate::error::{Result, StatsError};
use crate::models::{compare_values, FilterSet, QueryOptions, QueryResult, Row};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

/// Collections held in memory.
///
/// Rows are kept exactly as inserted, duplicates included, so the store
/// behaves like the untrusted upstream it stands in for.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Row>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bulk insert.
    pub fn with_rows(self, collection: &str, rows: Vec<Row>) -> Self {
        if let Ok(mut collections) = self.collections.write() {
            collections
                .entry(collection.to_string())
                .or_default()
                .extend(rows);
        }
        self
    }

    /// Append one row.
    pub fn insert(&self, collection: &str, row: Row) -> Result<()> {
        let mut collections = self.collections.write().map_err(lock_poisoned)?;
        collections.entry(collection.to_string()).or_default().push(row);
        Ok(())
    }

    /// Build from `{ "collection": [ {..row..}, ... ], ... }`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(StatsError::InvalidParams {
                message: "fixtures must be a JSON object of collections".to_string(),
            });
        };

        let mut collections = HashMap::new();
        for (name, rows) in map {
            let rows: Vec<Row> = serde_json::from_value(rows)?;
            collections.insert(name, rows);
        }

        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Load fixtures from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| StatsError::Config {
            message: format!("Failed to read fixtures {}: {}", path.display(), e),
        })?;
        Self::from_json(serde_json::from_str(&contents)?)
    }

    fn matching_rows(&self, collection: &str, filters: &FilterSet) -> Result<Vec<Row>> {
        let collections = self.collections.read().map_err(lock_poisoned)?;
        Ok(collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn query(
        &self,
        collection: &str,
        filters: &FilterSet,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        let mut rows = self.matching_rows(collection, filters)?;

        if let Some(order) = &options.order_by {
            rows.sort_by(|a, b| {
                let ordering = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        let offset = options.offset.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        let rows: Vec<Row> = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, &options.columns))
            .collect();

        debug!("In-memory query {} returned {} rows", collection, rows.len());
        Ok(QueryResult::new(rows))
    }

    async fn count(&self, collection: &str, filters: &FilterSet) -> Result<u64> {
        Ok(self.matching_rows(collection, filters)?.len() as u64)
    }
}

/// Keep only the selected columns; an empty selection keeps the row whole.
fn project(row: Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row;
    }
    row.into_iter()
        .filter(|(column, _)| columns.contains(column))
        .collect()
}

fn lock_poisoned<T>(_: T) -> StatsError {
    StatsError::Other("in-memory store lock poisoned".to_string())
}
