//! JSON-RPC request handlers.

mod stats;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use commstats_core::StatsError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

// ============================================================================
// HTTP handlers
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate handler.
async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> commstats_core::Result<Value> {
    match method {
        "get_dashboard_stats" => stats::get_dashboard_stats(state, params).await,
        "get_entities_with_stats" => stats::get_entities_with_stats(state, params).await,
        "invalidate_cache" => stats::invalidate_cache(state, params).await,
        "get_cache_stats" => stats::get_cache_stats(state, params).await,

        _ => {
            warn!("Method not found: {}", method);
            Err(StatsError::MethodNotFound(method.to_string()))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use commstats_core::{AggregationService, InMemoryStore, Row};

    fn state() -> Arc<AppState> {
        let rows: Vec<Row> =
            serde_json::from_value(json!([{"id": 1, "name": "Acme"}, {"id": 2, "name": "Globex"}]))
                .unwrap();
        let store = InMemoryStore::new().with_rows("companies", rows);
        Arc::new(AppState {
            service: AggregationService::with_store(Arc::new(store)),
        })
    }

    async fn call(state: Arc<AppState>, method: &str, params: Value) -> Value {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: Some(params),
            id: Some(json!(7)),
        };
        let response = handle_rpc(State(state), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_get_str_param_accepts_both_cases() {
        let params = json!({"collection": "companies", "cacheKey": "x"});
        assert_eq!(
            get_str_param(&params, "collection", "collection"),
            Some("companies")
        );
        assert_eq!(get_str_param(&params, "cache_key", "cacheKey"), Some("x"));
        assert_eq!(get_str_param(&params, "missing", "missingToo"), None);
    }

    #[tokio::test]
    async fn test_health_check_method() {
        let payload = call(state(), "health_check", json!({})).await;
        assert_eq!(payload["result"]["status"], json!("ok"));
        assert_eq!(payload["id"], json!(7));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let payload = call(state(), "drop_tables", json!({})).await;
        assert_eq!(payload["error"]["code"], json!(-32601));
        assert!(payload.get("result").is_none());
    }

    #[tokio::test]
    async fn test_dashboard_stats_method() {
        let payload = call(state(), "get_dashboard_stats", json!({})).await;
        assert_eq!(payload["result"]["companies"], json!(2));
        assert_eq!(payload["result"]["storageUsedBytes"], json!(0));
    }

    #[tokio::test]
    async fn test_dispatch_entities_default_collection() {
        let state = state();
        let result = dispatch_method(&state, "get_entities_with_stats", &json!({}))
            .await
            .unwrap();
        assert_eq!(result.as_array().map(|a| a.len()), Some(2));
    }
}
