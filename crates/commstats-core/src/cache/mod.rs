//! Volatile, process-local cache for computed statistics.
//!
//! One TTL shared by every key; entries are rebuilt from the remote store on
//! miss and never persisted.

mod key;
mod ttl;

pub use key::CacheKey;
pub use ttl::{CacheEntry, CacheStats, TtlCache};
