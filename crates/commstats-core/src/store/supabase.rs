//! Supabase (PostgREST) collection store over HTTP.

use super::CollectionStore;
use crate::config::{StoreConfig, SupabaseConfig};
use crate::error::{Result, StatsError};
use crate::models::{FilterSet, QueryOptions, QueryResult, Row};
use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tracing::debug;
use url::Url;

/// PostgREST client for a Supabase project.
pub struct SupabaseStore {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseStore {
    /// Create a store for the given project.
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("commstats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatsError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Create a store from `SUPABASE_URL` / `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(SupabaseConfig::from_env()?)
    }

    /// `{url}/rest/v1/{collection}?select=*&{filters}&order=&limit=&offset=`
    pub fn collection_url(
        &self,
        collection: &str,
        filters: &FilterSet,
        options: &QueryOptions,
    ) -> Result<Url> {
        let base = format!(
            "{}/{}/{}",
            self.config.url.trim_end_matches('/'),
            StoreConfig::REST_PATH,
            collection
        );
        let mut url = Url::parse(&base).map_err(|e| StatsError::Config {
            message: format!("Invalid store URL {}: {}", base, e),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &options.select());
            for (column, filter) in filters.to_query_pairs() {
                pairs.append_pair(&column, &filter);
            }
            if let Some(order) = &options.order_by {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
            if let Some(limit) = options.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = options.offset {
                pairs.append_pair("offset", &offset.to_string());
            }
        }

        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StatsError::Timeout(self.config.request_timeout)
            } else {
                StatsError::Transport {
                    message: format!("{} failed: {}", what, e),
                    status: None,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsError::Transport {
                message: format!("{} returned {}", what, status),
                status: Some(status.as_u16()),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CollectionStore for SupabaseStore {
    async fn query(
        &self,
        collection: &str,
        filters: &FilterSet,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        let url = self.collection_url(collection, filters, options)?;
        debug!("GET {}", url);

        let response = self
            .send(self.request(Method::GET, url), &format!("query {}", collection))
            .await?;
        let rows: Vec<Row> = response.json().await.map_err(|e| StatsError::Transport {
            message: format!("Invalid rows from {}: {}", collection, e),
            status: None,
        })?;

        Ok(QueryResult::new(rows))
    }

    async fn count(&self, collection: &str, filters: &FilterSet) -> Result<u64> {
        let url = self.collection_url(collection, filters, &QueryOptions::new())?;
        debug!("HEAD {}", url);

        let request = self
            .request(Method::HEAD, url)
            .header("Prefer", "count=exact");
        let response = self.send(request, &format!("count {}", collection)).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StatsError::Transport {
                message: format!("count {} returned no Content-Range total", collection),
                status: Some(response.status().as_u16()),
            })
    }
}

/// Total from a PostgREST `Content-Range` header (`0-24/311`, `*/0`).
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
}
