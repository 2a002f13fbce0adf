use crate::listing::{metrics::LikesLatency, store::LikeStore};
use postboard_common::model::{
    like::{LikeTarget, Likeable, Liked, Likes},
    user::Requester,
};
use postboard_db::kv::KvError;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    LikeStore(#[from] KvError),
    #[error("Enrichment task did not run to completion: {0}")]
    Task(#[from] JoinError),
}

/// Reads the likes of one entity: the count, then whether `requester` is among them.
///
/// Anonymous requesters never like anything, so their membership is not looked up. The count
/// read is timed into `latency` whether it succeeds or not.
pub async fn fetch_likes(
    likes: &dyn LikeStore,
    latency: &LikesLatency,
    target: LikeTarget,
    requester: Requester,
) -> Result<Likes, KvError> {
    debug!(%target, "Fetching like count");
    let start = Instant::now();
    let count = likes.cardinality(target).await;
    latency.record_since(start);
    let count = count?;

    let liked_by_requester = match requester.user() {
        Some(user) => {
            debug!(%target, %user, "Fetching whether requester liked");
            likes.is_member(target, user).await?
        }
        None => false,
    };

    Ok(Likes {
        count,
        liked_by_requester,
    })
}

/// Decorates every item with its likes, one task per item.
///
/// Either every item is decorated or the whole batch fails with the first failure observed;
/// the other failures are only logged. The result is sorted by id whatever order the tasks
/// finish in. Dropping the returned future aborts the tasks still running.
pub async fn enrich<T>(
    likes: &Arc<dyn LikeStore>,
    latency: &LikesLatency,
    items: Vec<T>,
    requester: Requester,
) -> Result<Vec<Liked<T>>, EnrichError>
where
    T: Likeable + Send + 'static,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut tasks = JoinSet::new();
    for item in items {
        let likes = Arc::clone(likes);
        let latency = latency.clone();
        tasks.spawn(async move {
            let likes =
                fetch_likes(likes.as_ref(), &latency, item.like_target(), requester).await?;
            Ok::<_, KvError>(Liked { item, likes })
        });
    }

    let mut decorated = Vec::with_capacity(tasks.len());
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(EnrichError::from)
            .and_then(|result| result.map_err(EnrichError::from));

        match result {
            Ok(item) => decorated.push(item),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => debug!(error = %err, "Discarding further enrichment failure"),
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    decorated.sort_by_key(Likeable::like_target);
    Ok(decorated)
}
