//! Aggregation service: cached dashboard statistics over the collection store.
//!
//! Every store call is a `Result`. Failed slots go through [`degrade`], which
//! logs the failure and substitutes a default, so callers always get data:
//! zeros on total failure, a mix of real and zeroed metrics on partial
//! failure, or the last cached value.

use crate::cache::{CacheKey, CacheStats, TtlCache};
use crate::config::{AggregationConfig, Collections};
use crate::dedupe::{dedupe_rows, row_identity, Deduped};
use crate::error::{Result, StatsError};
use crate::fanout::{fan_out, fan_out_limited, spawn_with_timeout, with_timeout};
use crate::metrics::{self, MessageBreakdown};
use crate::models::{
    DashboardStats, EntityKind, EntityStats, EntityWithStats, FilterSet, QueryOptions, Row,
};
use crate::store::CollectionStore;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Collections counted for the dashboard, in `DashboardStats` field order.
const DASHBOARD_COLLECTIONS: [&str; 5] = [
    Collections::COMPANIES,
    Collections::EMPLOYEES,
    Collections::FOLDERS,
    Collections::DOCUMENTS,
    Collections::COMMUNICATION_LOGS,
];

/// Values stored in the stats cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Dashboard(DashboardStats),
    Entities(Arc<Vec<EntityWithStats>>),
}

/// The process-wide cache the service is constructed with.
pub type StatsCache = TtlCache<CachedValue>;

/// Substitute the default for a failed slot, logging why.
pub fn degrade<T: Default>(slot: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} unavailable, using default: {}", slot, e);
            T::default()
        }
    }
}

fn report_duplicates<T>(collection: &str, deduped: &Deduped<T>) {
    if deduped.has_duplicates() {
        warn!(
            "Data quality: {} returned {} duplicate rows",
            collection, deduped.duplicate_count
        );
    }
}

/// Cached, failure-tolerant dashboard statistics.
pub struct AggregationService {
    store: Arc<dyn CollectionStore>,
    cache: Arc<StatsCache>,
    config: AggregationConfig,
}

impl AggregationService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        cache: Arc<StatsCache>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Service with a fresh default cache and default config.
    pub fn with_store(store: Arc<dyn CollectionStore>) -> Self {
        Self::new(store, Arc::new(StatsCache::new()), AggregationConfig::default())
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Dashboard statistics, cache-first. Never fails.
    pub async fn get_dashboard_stats(&self) -> DashboardStats {
        if let Some(CachedValue::Dashboard(stats)) = self.cache.get(CacheKey::DASHBOARD_STATS) {
            return stats;
        }

        let stats = match AssertUnwindSafe(self.compute_dashboard_stats())
            .catch_unwind()
            .await
        {
            Ok(stats) => stats,
            Err(_) => {
                error!("Dashboard stats composition panicked, serving zeros");
                DashboardStats::default()
            }
        };

        self.cache.set(
            CacheKey::DASHBOARD_STATS,
            CachedValue::Dashboard(stats.clone()),
        );
        stats
    }

    /// Entities of a collection annotated with message stats, cache-first.
    ///
    /// Unknown collections and an unreachable base collection yield an empty
    /// list, which is not cached.
    pub async fn get_entities_with_stats(&self, collection: &str) -> Vec<EntityWithStats> {
        let Some(kind) = EntityKind::from_collection(collection) else {
            warn!("No entity stats available for collection {}", collection);
            return Vec::new();
        };

        let key = CacheKey::entities_with_stats(kind);
        if let Some(CachedValue::Entities(entities)) = self.cache.get(&key) {
            return entities.as_ref().clone();
        }

        match AssertUnwindSafe(self.compute_entities_with_stats(kind))
            .catch_unwind()
            .await
        {
            Ok(Ok(entities)) => {
                self.cache
                    .set(&key, CachedValue::Entities(Arc::new(entities.clone())));
                entities
            }
            Ok(Err(e)) => {
                warn!("Failed to load {}: {}", kind, e);
                Vec::new()
            }
            Err(_) => {
                error!("Entity stats composition for {} panicked", kind);
                Vec::new()
            }
        }
    }

    /// Drop cached results after a write.
    ///
    /// `None` clears everything. A collection clears the dashboard entry and
    /// every entity listing that reads from that collection.
    pub fn invalidate(&self, collection: Option<&str>) {
        let Some(collection) = collection else {
            self.cache.clear(None);
            info!("Cleared stats cache");
            return;
        };

        self.cache.clear(Some(CacheKey::DASHBOARD_STATS));
        for kind in [EntityKind::Companies, EntityKind::Employees] {
            if kind.reads(collection) {
                self.cache.clear(Some(&CacheKey::entities_with_stats(kind)));
            }
        }
        info!("Invalidated cached stats for {}", collection);
    }

    async fn compute_dashboard_stats(&self) -> DashboardStats {
        let queries = DASHBOARD_COLLECTIONS
            .into_iter()
            .map(|collection| self.count_query(collection, FilterSet::new()))
            .collect();
        let counts: Vec<u64> = fan_out(queries, self.config.count_timeout)
            .await
            .into_iter()
            .zip(DASHBOARD_COLLECTIONS)
            .map(|(result, collection)| degrade(collection, result))
            .collect();

        let [companies, employees, folders, documents, communications] = counts[..] else {
            error!(
                "Expected {} dashboard counts, got {}",
                DASHBOARD_COLLECTIONS.len(),
                counts.len()
            );
            return DashboardStats::default();
        };

        // Best-effort derived metrics, each zeroed on its own failure
        let since = (Utc::now() - self.config.growth_window).to_rfc3339();
        let recent = spawn_with_timeout(
            self.count_query(
                Collections::EMPLOYEES,
                FilterSet::new().gte("created_at", since),
            ),
            self.config.derived_timeout,
        );
        let sample = spawn_with_timeout(
            self.communication_sample(),
            self.config.derived_timeout,
        );
        let (recent, sample) = futures::join!(recent, sample);
        let recent_employees = degrade("recent employees", recent);
        let sample: Vec<Row> = degrade("communication sample", sample);

        debug!(
            "Dashboard counts: {} companies, {} employees, {} sampled logs",
            companies,
            employees,
            sample.len()
        );

        DashboardStats {
            companies,
            employees,
            folders,
            documents,
            communications,
            tokens_used: metrics::sum_tokens(&sample),
            storage_used_bytes: metrics::estimated_storage_bytes(
                documents,
                self.config.avg_document_size_bytes,
            ),
            monthly_growth_pct: metrics::growth_pct(recent_employees, employees),
            success_rate_pct: metrics::success_rate_pct(
                metrics::successful_count(&sample),
                sample.len() as u64,
            ),
            active_users: metrics::distinct_count(&sample, "employee_id"),
        }
    }

    async fn compute_entities_with_stats(
        &self,
        kind: EntityKind,
    ) -> Result<Vec<EntityWithStats>> {
        let options = QueryOptions::newest_first("created_at");
        let filters = FilterSet::new();
        let base = with_timeout(
            self.store.query(kind.collection(), &filters, &options),
            self.config.count_timeout,
        )
        .await??;

        let entities = dedupe_rows(base.rows);
        report_duplicates(kind.collection(), &entities);

        let now = Utc::now();
        let queries: Vec<BoxFuture<'static, Result<EntityStats>>> = entities
            .unique
            .iter()
            .map(|entity| {
                fetch_entity_stats(
                    Arc::clone(&self.store),
                    kind,
                    entity.get("id").cloned(),
                    now,
                )
                .boxed()
            })
            .collect();
        let results = fan_out_limited(
            queries,
            self.config.entity_timeout,
            self.config.entity_concurrency,
        )
        .await;

        Ok(entities
            .unique
            .into_iter()
            .zip(results)
            .map(|(entity, result)| {
                let slot = format!("{} {} stats", kind, row_identity(&entity));
                let stats = degrade(&slot, result);
                EntityWithStats::new(entity, stats)
            })
            .collect())
    }

    fn count_query(
        &self,
        collection: &'static str,
        filters: FilterSet,
    ) -> BoxFuture<'static, Result<u64>> {
        distinct_count(
            Arc::clone(&self.store),
            collection,
            filters,
            self.config.id_page_size,
        )
        .boxed()
    }

    fn communication_sample(&self) -> BoxFuture<'static, Result<Vec<Row>>> {
        let store = Arc::clone(&self.store);
        let options = QueryOptions::newest_first("created_at")
            .with_limit(self.config.communication_sample_limit);
        async move {
            let result = store
                .query(Collections::COMMUNICATION_LOGS, &FilterSet::new(), &options)
                .await?;
            let logs = dedupe_rows(result.rows);
            report_duplicates(Collections::COMMUNICATION_LOGS, &logs);
            Ok(logs.unique)
        }
        .boxed()
    }
}

/// Number of distinct rows by primary key.
///
/// Reads `id` only, page by page, and deduplicates across pages so the
/// dashboard agrees with the deduplicated listings. Falls back to the store's
/// own count when the read fails.
async fn distinct_count(
    store: Arc<dyn CollectionStore>,
    collection: &'static str,
    filters: FilterSet,
    page_size: usize,
) -> Result<u64> {
    match read_ids(store.as_ref(), collection, &filters, page_size).await {
        Ok(ids) => {
            let ids = dedupe_rows(ids);
            report_duplicates(collection, &ids);
            Ok(ids.unique.len() as u64)
        }
        Err(e) => {
            warn!("Reading {} ids failed, using raw count: {}", collection, e);
            store.count(collection, &filters).await
        }
    }
}

async fn read_ids(
    store: &dyn CollectionStore,
    collection: &str,
    filters: &FilterSet,
    page_size: usize,
) -> Result<Vec<Row>> {
    let page_size = page_size.max(1);
    let mut ids = Vec::new();
    loop {
        let options = QueryOptions::ascending_by("id")
            .with_columns(&["id"])
            .with_limit(page_size)
            .with_offset(ids.len());
        let page = store.query(collection, filters, &options).await?;
        let fetched = page.rows.len();
        ids.extend(page.rows);
        if fetched < page_size {
            return Ok(ids);
        }
    }
}

/// Employee count and communication logs for one entity.
async fn fetch_entity_stats(
    store: Arc<dyn CollectionStore>,
    kind: EntityKind,
    id: Option<Value>,
    now: DateTime<Utc>,
) -> Result<EntityStats> {
    let id = id
        .filter(|id| !id.is_null())
        .ok_or_else(|| StatsError::Other(format!("{} row has no id", kind)))?;
    let filters = FilterSet::new().eq(kind.foreign_key(), id);

    let employee_count = async {
        if kind.counts_employees() {
            store.count(Collections::EMPLOYEES, &filters).await
        } else {
            Ok(0)
        }
    };
    let log_options = QueryOptions::default();
    let logs = store.query(Collections::COMMUNICATION_LOGS, &filters, &log_options);
    let (employee_count, logs) = futures::try_join!(employee_count, logs)?;

    let logs = dedupe_rows(logs.rows);
    report_duplicates(Collections::COMMUNICATION_LOGS, &logs);

    Ok(MessageBreakdown::from_logs(&logs.unique, now).into_entity_stats(employee_count))
}
