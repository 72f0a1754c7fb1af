//! Concurrent sub-query execution with per-query timeouts.
//!
//! Each query runs as its own task and is raced against its own timer. A
//! timed-out query is detached rather than aborted (the remote call cannot be
//! cancelled), and whatever it eventually returns is dropped. Failures are
//! reported per slot; the fan-out itself never fails.

use crate::error::{Result, StatsError};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Race a future against a timer.
pub async fn with_timeout<F, T>(future: F, timeout: Duration) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| StatsError::Timeout(timeout))
}

/// Spawn a query and wait for it at most `timeout`.
///
/// On timeout the task keeps running detached. A panicking query is reported
/// as [`StatsError::TaskFailed`].
pub async fn spawn_with_timeout<F, R>(query: F, timeout: Duration) -> Result<R>
where
    F: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let handle = tokio::spawn(query);
    let joined = with_timeout(handle, timeout).await?;
    joined?
}

/// Run every query concurrently, one result per query in input order.
pub async fn fan_out<R>(
    queries: Vec<BoxFuture<'static, Result<R>>>,
    per_query_timeout: Duration,
) -> Vec<Result<R>>
where
    R: Send + 'static,
{
    let limit = queries.len();
    fan_out_limited(queries, per_query_timeout, limit).await
}

/// Like [`fan_out`], with at most `max_in_flight` queries running at once.
///
/// A query's timer starts when it is launched, not when it is queued.
pub async fn fan_out_limited<R>(
    queries: Vec<BoxFuture<'static, Result<R>>>,
    per_query_timeout: Duration,
    max_in_flight: usize,
) -> Vec<Result<R>>
where
    R: Send + 'static,
{
    let total = queries.len();
    let launches: Vec<_> = queries
        .into_iter()
        .map(|query| spawn_with_timeout(query, per_query_timeout))
        .collect();
    let results: Vec<Result<R>> = stream::iter(launches)
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!("{}/{} fan-out queries failed", failed, total);
    } else {
        debug!("{} fan-out queries completed", total);
    }

    results
}
