//! Parallel fan-out.

use std::future::Future;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};

/// Run independent branches concurrently and join on all of them.
///
/// Results are returned in branch order, not completion order. The first
/// failing branch fails the join; no partial results are returned.
pub async fn parallel_all<I, F, T, E>(branches: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(branches).await
}

/// Like [`parallel_all`] but with at most `limit` branches in flight.
pub async fn parallel_all_limited<I, F, T, E>(branches: I, limit: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    stream::iter(branches)
        .buffered(limit.max(1))
        .try_collect()
        .await
}
