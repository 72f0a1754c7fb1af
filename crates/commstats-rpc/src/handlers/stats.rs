//! Dashboard statistics handlers.

use super::get_str_param;
use crate::server::AppState;
use commstats_core::{EntityKind, StatsError};
use serde_json::{json, Value};

pub async fn get_dashboard_stats(
    state: &AppState,
    _params: &Value,
) -> commstats_core::Result<Value> {
    let stats = state.service.get_dashboard_stats().await;
    Ok(serde_json::to_value(stats)?)
}

pub async fn get_entities_with_stats(
    state: &AppState,
    params: &Value,
) -> commstats_core::Result<Value> {
    let collection = get_str_param(params, "collection", "collection").unwrap_or("companies");
    if EntityKind::from_collection(collection).is_none() {
        return Err(StatsError::InvalidParams {
            message: format!("Unsupported collection: {}", collection),
        });
    }

    let entities = state.service.get_entities_with_stats(collection).await;
    Ok(serde_json::to_value(entities)?)
}

pub async fn invalidate_cache(state: &AppState, params: &Value) -> commstats_core::Result<Value> {
    let collection = get_str_param(params, "collection", "collection");
    state.service.invalidate(collection);

    Ok(json!({
        "success": true,
        "collection": collection,
    }))
}

pub async fn get_cache_stats(state: &AppState, _params: &Value) -> commstats_core::Result<Value> {
    let stats = state.service.cache_stats();
    Ok(json!({
        "hits": stats.hits,
        "misses": stats.misses,
        "entryCount": stats.entry_count,
        "hitRate": stats.hit_rate(),
        "ttlSecs": state.service.cache_ttl().as_secs(),
    }))
}
