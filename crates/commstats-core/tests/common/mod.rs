//! Shared fixtures for commstats-core integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use commstats_core::{
    CollectionStore, Filter, FilterSet, InMemoryStore, QueryOptions, QueryResult, Result, Row,
    StatsError,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Wraps an [`InMemoryStore`] and injects failures, delays and panics.
pub struct FaultyStore {
    inner: InMemoryStore,
    failing: Mutex<HashSet<String>>,
    failing_reads: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    failing_filters: Vec<(String, Value)>,
    calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            failing_reads: HashSet::new(),
            panicking: HashSet::new(),
            delays: HashMap::new(),
            failing_filters: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call on the collection fails with a transport error.
    pub fn fail_collection(self, collection: &str) -> Self {
        self.failing.lock().unwrap().insert(collection.to_string());
        self
    }

    /// Row reads on the collection fail; counts still succeed.
    pub fn fail_reads(mut self, collection: &str) -> Self {
        self.failing_reads.insert(collection.to_string());
        self
    }

    /// Every call on the collection panics.
    pub fn panic_collection(mut self, collection: &str) -> Self {
        self.panicking.insert(collection.to_string());
        self
    }

    /// Every call on the collection sleeps first.
    pub fn delay_collection(mut self, collection: &str, delay: Duration) -> Self {
        self.delays.insert(collection.to_string(), delay);
        self
    }

    /// Calls filtered by `column = value` fail, whatever the collection.
    pub fn fail_filter(mut self, column: &str, value: Value) -> Self {
        self.failing_filters.push((column.to_string(), value));
        self
    }

    /// Stop failing calls on the collection.
    pub fn heal(&self, collection: &str) {
        self.failing.lock().unwrap().remove(collection);
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn before_call(&self, collection: &str, filters: &FilterSet) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(collection) {
            tokio::time::sleep(*delay).await;
        }
        if self.panicking.contains(collection) {
            panic!("injected panic reading {}", collection);
        }
        if self.failing.lock().unwrap().contains(collection) {
            return Err(StatsError::transport(format!("{} unavailable", collection)));
        }

        let hits_failing_filter = filters.iter().any(|(column, filter)| {
            self.failing_filters
                .iter()
                .any(|(c, v)| c == column && *filter == Filter::Eq(v.clone()))
        });
        if hits_failing_filter {
            return Err(StatsError::Transport {
                message: "connection reset".to_string(),
                status: Some(503),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl CollectionStore for FaultyStore {
    async fn query(
        &self,
        collection: &str,
        filters: &FilterSet,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        self.before_call(collection, filters).await?;
        if self.failing_reads.contains(collection) {
            return Err(StatsError::transport(format!("{} reads unavailable", collection)));
        }
        self.inner.query(collection, filters, options).await
    }

    async fn count(&self, collection: &str, filters: &FilterSet) -> Result<u64> {
        self.before_call(collection, filters).await?;
        self.inner.count(collection, filters).await
    }
}

pub fn rows(values: Value) -> Vec<Row> {
    serde_json::from_value(values).unwrap()
}

/// `n` companies with ids `1..=n`, two employees each, and four read
/// messages per company.
pub fn company_fixture(n: u64) -> InMemoryStore {
    let companies: Vec<Value> = (1..=n)
        .map(|id| json!({"id": id, "name": format!("Company {}", id)}))
        .collect();
    let employees: Vec<Value> = (1..=n)
        .flat_map(|company| {
            (0..2).map(move |i| {
                json!({
                    "id": company * 100 + i,
                    "company_id": company,
                    "created_at": "2020-01-01T00:00:00Z"
                })
            })
        })
        .collect();
    let logs: Vec<Value> = (1..=n)
        .flat_map(|company| {
            (0..4).map(move |i| {
                json!({
                    "id": company * 1000 + i,
                    "company_id": company,
                    "employee_id": company * 100,
                    "status": "read",
                    "tokens_used": 10
                })
            })
        })
        .collect();

    InMemoryStore::new()
        .with_rows("companies", rows(Value::Array(companies)))
        .with_rows("employees", rows(Value::Array(employees)))
        .with_rows("folders", rows(json!([{"id": 1}, {"id": 2}])))
        .with_rows("documents", rows(json!([{"id": 1}])))
        .with_rows("communication_logs", rows(Value::Array(logs)))
}
