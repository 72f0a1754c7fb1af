//! Remote collection store interface and adapters.
//!
//! The store is treated as unreliable: calls may be slow, fail independently,
//! and return duplicate rows. Transport failures are always reported as
//! errors, never as an empty result.

mod memory;
mod supabase;

pub use memory::InMemoryStore;
pub use supabase::{parse_content_range_total, SupabaseStore};

use crate::error::Result;
use crate::models::{FilterSet, QueryOptions, QueryResult};
use async_trait::async_trait;

/// Filtered, ordered and counted reads over named collections.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Read rows matching `filters`.
    async fn query(
        &self,
        collection: &str,
        filters: &FilterSet,
        options: &QueryOptions,
    ) -> Result<QueryResult>;

    /// Count rows matching `filters`.
    async fn count(&self, collection: &str, filters: &FilterSet) -> Result<u64>;
}
