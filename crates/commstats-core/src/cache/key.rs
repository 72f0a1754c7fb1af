//! Deterministic cache key derivation.

use crate::models::{EntityKind, FilterSet};

/// Builders for cache keys.
///
/// Keys are derived from the logical query, so two semantically equal queries
/// always share one entry.
pub struct CacheKey;

impl CacheKey {
    pub const DASHBOARD_STATS: &'static str = "dashboard_stats";

    /// `collection` or `collection?col=op.value&...` in column order.
    pub fn for_query(collection: &str, filters: &FilterSet) -> String {
        let collection = collection.trim().to_lowercase();
        if filters.is_empty() {
            collection
        } else {
            format!("{}?{}", collection, filters.render())
        }
    }

    /// Key for the per-entity stats listing of a collection.
    pub fn entities_with_stats(kind: EntityKind) -> String {
        format!(
            "entities_with_stats:{}",
            Self::for_query(kind.collection(), &FilterSet::new())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_queries_share_a_key() {
        let a = FilterSet::new().eq("status", "read").eq("company_id", 3);
        let b = FilterSet::new().eq("company_id", 3).eq("status", "read");

        assert_eq!(
            CacheKey::for_query("communication_logs", &a),
            CacheKey::for_query("Communication_Logs", &b)
        );
        assert_eq!(
            CacheKey::for_query("communication_logs", &a),
            "communication_logs?company_id=eq.3&status=eq.read"
        );
    }

    #[test]
    fn test_unfiltered_key_is_collection_name() {
        assert_eq!(CacheKey::for_query("companies", &FilterSet::new()), "companies");
    }

    #[test]
    fn test_entity_keys_are_distinct() {
        let companies = CacheKey::entities_with_stats(EntityKind::Companies);
        let employees = CacheKey::entities_with_stats(EntityKind::Employees);

        assert_eq!(companies, "entities_with_stats:companies");
        assert_ne!(companies, employees);
        assert_ne!(companies, CacheKey::DASHBOARD_STATS);
    }
}
