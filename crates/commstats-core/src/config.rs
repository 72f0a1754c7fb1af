//! Centralized configuration for commstats.
//!
//! Constants for cache lifetime, query timeouts and metric estimation, plus
//! the runtime configuration structs built from them.

use crate::error::{Result, StatsError};
use std::time::Duration;

/// Collection names in the remote store.
pub struct Collections;

impl Collections {
    pub const COMPANIES: &'static str = "companies";
    pub const EMPLOYEES: &'static str = "employees";
    pub const FOLDERS: &'static str = "folders";
    pub const DOCUMENTS: &'static str = "documents";
    pub const COMMUNICATION_LOGS: &'static str = "communication_logs";
}

/// Cache lifetime.
pub struct CacheSettings;

impl CacheSettings {
    pub const TTL: Duration = Duration::from_secs(300);
}

/// Dashboard statistics configuration.
pub struct StatsConfig;

impl StatsConfig {
    /// Coarse per-document size used for the storage estimate.
    pub const AVG_DOCUMENT_SIZE_BYTES: u64 = 1_048_576; // 1MB
    pub const COUNT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DERIVED_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
    pub const ENTITY_STATS_TIMEOUT: Duration = Duration::from_secs(10);
    pub const GROWTH_WINDOW_DAYS: i64 = 30;
    pub const COMMUNICATION_SAMPLE_LIMIT: usize = 1000;
    /// Rows per page when reading primary keys for distinct counts.
    pub const ID_PAGE_SIZE: usize = 1000;
    /// Entities whose stats are fetched at the same time.
    pub const ENTITY_FETCH_CONCURRENCY: usize = 16;
}

/// Remote store configuration.
pub struct StoreConfig;

impl StoreConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const REST_PATH: &'static str = "rest/v1";
    pub const URL_ENV: &'static str = "SUPABASE_URL";
    pub const API_KEY_ENV: &'static str = "SUPABASE_ANON_KEY";
}

/// Runtime configuration for the aggregation service.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Per-query timeout for the top-level counts and the base entity fetch.
    pub count_timeout: Duration,
    /// Per-query timeout for the best-effort derived metrics.
    pub derived_timeout: Duration,
    /// Per-entity timeout for entity stats.
    pub entity_timeout: Duration,
    /// Window for the monthly growth metric.
    pub growth_window: chrono::Duration,
    /// Number of newest communication logs sampled for derived metrics.
    pub communication_sample_limit: usize,
    /// Average document size used by the storage estimate.
    pub avg_document_size_bytes: u64,
    /// Page size for `id`-only reads behind the dashboard counts.
    pub id_page_size: usize,
    /// Upper bound on per-entity stat fetches in flight.
    pub entity_concurrency: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            count_timeout: StatsConfig::COUNT_QUERY_TIMEOUT,
            derived_timeout: StatsConfig::DERIVED_QUERY_TIMEOUT,
            entity_timeout: StatsConfig::ENTITY_STATS_TIMEOUT,
            growth_window: chrono::Duration::days(StatsConfig::GROWTH_WINDOW_DAYS),
            communication_sample_limit: StatsConfig::COMMUNICATION_SAMPLE_LIMIT,
            avg_document_size_bytes: StatsConfig::AVG_DOCUMENT_SIZE_BYTES,
            id_page_size: StatsConfig::ID_PAGE_SIZE,
            entity_concurrency: StatsConfig::ENTITY_FETCH_CONCURRENCY,
        }
    }
}

impl AggregationConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for top-level count queries.
    pub fn with_count_timeout(mut self, timeout: Duration) -> Self {
        self.count_timeout = timeout;
        self
    }

    /// Set the timeout for derived-metric queries.
    pub fn with_derived_timeout(mut self, timeout: Duration) -> Self {
        self.derived_timeout = timeout;
        self
    }

    /// Set the timeout for per-entity stat fetches.
    pub fn with_entity_timeout(mut self, timeout: Duration) -> Self {
        self.entity_timeout = timeout;
        self
    }

    /// Set the communication sample size.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.communication_sample_limit = limit;
        self
    }

    /// Set the page size for `id`-only reads (at least 1).
    pub fn with_id_page_size(mut self, size: usize) -> Self {
        self.id_page_size = size.max(1);
        self
    }

    /// Set how many entity stat fetches may run at once (at least 1).
    pub fn with_entity_concurrency(mut self, limit: usize) -> Self {
        self.entity_concurrency = limit.max(1);
        self
    }
}

/// Connection settings for a Supabase (PostgREST) project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Anonymous or service API key.
    pub api_key: String,
    /// Transport-level timeout for a single request.
    pub request_timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            request_timeout: StoreConfig::REQUEST_TIMEOUT,
        }
    }

    /// Read `SUPABASE_URL` and `SUPABASE_ANON_KEY` from the environment.
    pub fn from_env() -> Result<Self> {
        let url = read_env(StoreConfig::URL_ENV)?;
        let api_key = read_env(StoreConfig::API_KEY_ENV)?;
        Ok(Self::new(url, api_key))
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StatsError::Config {
            message: format!("{} is not set", name),
        }),
    }
}
