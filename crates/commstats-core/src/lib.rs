//! Commstats Core - cached, failure-tolerant statistics for the HR dashboard.
//!
//! Reads collections (companies, employees, folders, documents, communication
//! logs) from an unreliable remote store, fans queries out concurrently with
//! per-query timeouts, deduplicates rows, derives metrics and caches the
//! results. Every public read degrades to zeros instead of failing.
//!
//! # Example
//!
//! ```rust,ignore
//! use commstats_core::{AggregationService, SupabaseStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> commstats_core::Result<()> {
//!     let store = SupabaseStore::from_env()?;
//!     let service = AggregationService::with_store(Arc::new(store));
//!
//!     let stats = service.get_dashboard_stats().await;
//!     println!("{} companies, {}% success", stats.companies, stats.success_rate_pct);
//!
//!     let companies = service.get_entities_with_stats("companies").await;
//!     println!("{} companies with stats", companies.len());
//!
//!     // After a write to the employees collection
//!     service.invalidate(Some("employees"));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod models;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStats, TtlCache};
pub use config::{AggregationConfig, Collections, SupabaseConfig};
pub use dedupe::{dedupe, dedupe_rows, value_key, Deduped};
pub use error::{Result, StatsError};
pub use fanout::{fan_out, fan_out_limited, spawn_with_timeout, with_timeout};
pub use models::{
    DashboardStats, EntityKind, EntityStats, EntityWithStats, Filter, FilterSet, QueryOptions,
    QueryResult, Row,
};
pub use service::{degrade, AggregationService, CachedValue, StatsCache};
pub use store::{CollectionStore, InMemoryStore, SupabaseStore};
