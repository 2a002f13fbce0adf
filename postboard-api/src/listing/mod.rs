//! The read path for post and comment listings.
//!
//! Anonymous requests that stay inside the front-page window are answered from a single cached
//! window of the first posts, decorated for the anonymous viewer. Every other request goes to the
//! repository and is decorated for its requester.
//!
//! The cached window is replaced only when it expires, so likes given in the meantime show up
//! late, by at most the cache TTL.

pub mod enrich;
pub mod metrics;
pub mod store;
#[cfg(test)]
pub mod testing;

use crate::listing::{
    enrich::{EnrichError, enrich, fetch_likes},
    metrics::LikesLatency,
    store::{LikeStore, ListingCache, PostRepository},
};
use postboard_common::{
    model::{
        Id,
        comment::LikedComment,
        like::{Likeable, Liked},
        post::{LikedPost, PostMarker},
        user::Requester,
    },
    util::PositiveDuration,
};
use postboard_db::{client::DbError, kv::KvError};
use std::{num::NonZeroU64, sync::Arc};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_LISTING_WINDOW: NonZeroU64 = NonZeroU64::new(30).unwrap();
pub const DEFAULT_LISTING_CACHE_TTL_SECONDS: i64 = 5;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum InvalidPageError {
    #[error("Offset must not be negative, got {0}")]
    NegativeOffset(i64),
    #[error("Limit must be at least 1, got {0}")]
    NonPositiveLimit(i64),
}

/// A validated `offset`/`limit` pair.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page {
    offset: u64,
    limit: NonZeroU64,
}

impl Page {
    pub fn new(offset: i64, limit: i64) -> Result<Self, InvalidPageError> {
        let offset =
            u64::try_from(offset).map_err(|_| InvalidPageError::NegativeOffset(offset))?;
        let limit = u64::try_from(limit)
            .ok()
            .and_then(NonZeroU64::new)
            .ok_or(InvalidPageError::NonPositiveLimit(limit))?;

        Ok(Self { offset, limit })
    }

    #[must_use]
    pub fn first(limit: NonZeroU64) -> Self {
        Self { offset: 0, limit }
    }

    /// One past the last position covered.
    #[must_use]
    pub fn end(self) -> u64 {
        self.offset.saturating_add(self.limit.get())
    }

    #[must_use]
    pub fn offset_i64(self) -> i64 {
        i64::try_from(self.offset).unwrap_or(i64::MAX)
    }

    #[must_use]
    pub fn limit_i64(self) -> i64 {
        i64::try_from(self.limit.get()).unwrap_or(i64::MAX)
    }

    /// The part of `items` this page covers; empty if the page starts past the end.
    #[must_use]
    pub fn slice<T>(self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit.get()).unwrap_or(usize::MAX);

        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// Whether a page can be cut out of the cached front-page window.
///
/// The window only holds the first `window` posts, decorated for nobody in particular, so the
/// page has to end strictly inside it and the requester has to be anonymous.
#[must_use]
pub fn is_cache_eligible(page: Page, requester: Requester, window: NonZeroU64) -> bool {
    page.end() < window.get() && requester.is_anonymous()
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ListingConfig {
    /// Number of posts in the cached front-page window.
    pub window: NonZeroU64,
    pub cache_ttl: PositiveDuration,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct ListingRequest {
    pub offset: i64,
    pub limit: i64,
    pub requester: Requester,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ListingErrorKind {
    InvalidArgument,
    StoreUnavailable,
    Inconsistent,
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Invalid page requested: {0}")]
    InvalidArgument(#[from] InvalidPageError),
    #[error("Fetching from the post repository failed: {0}")]
    Repository(#[from] DbError),
    #[error("Fetching likes failed: {0}")]
    Enrichment(#[from] EnrichError),
    #[error("Listing cache request failed: {0}")]
    Cache(#[source] KvError),
    #[error("Cached listing could not be encoded or decoded: {0}")]
    Inconsistent(#[source] serde_json::Error),
}

impl ListingError {
    #[must_use]
    pub fn kind(&self) -> ListingErrorKind {
        match self {
            ListingError::InvalidArgument(_) => ListingErrorKind::InvalidArgument,
            ListingError::Repository(_)
            | ListingError::Enrichment(_)
            | ListingError::Cache(_) => ListingErrorKind::StoreUnavailable,
            ListingError::Inconsistent(_) => ListingErrorKind::Inconsistent,
        }
    }
}

pub struct ListingService {
    repository: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeStore>,
    cache: Arc<dyn ListingCache>,
    config: ListingConfig,
    likes_latency: LikesLatency,
}

impl ListingService {
    #[must_use]
    pub fn new(
        repository: Arc<dyn PostRepository>,
        likes: Arc<dyn LikeStore>,
        cache: Arc<dyn ListingCache>,
        config: ListingConfig,
        likes_latency: LikesLatency,
    ) -> Self {
        Self {
            repository,
            likes,
            cache,
            config,
            likes_latency,
        }
    }

    /// Posts in ascending id order, each decorated for the requester.
    ///
    /// Fails as a whole if any store round trip fails; nothing partial is ever returned.
    pub async fn list_posts(
        &self,
        request: ListingRequest,
    ) -> Result<Vec<LikedPost>, ListingError> {
        let page = Page::new(request.offset, request.limit)?;
        let requester = request.requester;

        if !is_cache_eligible(page, requester, self.config.window) {
            debug!(?page, requester = requester.raw(), "Listing bypasses the cache");
            let posts = self.repository.fetch_posts(page).await?;
            return Ok(enrich(&self.likes, &self.likes_latency, posts, requester).await?);
        }

        if let Some(window) = self.cached_window().await? {
            debug!(?page, cached = window.len(), "Listing served from the cache");
            return Ok(page.slice(window));
        }

        let window = self.refresh_window().await?;
        Ok(page.slice(window))
    }

    /// Comments of one post in ascending id order, each decorated for the requester. Never
    /// cached.
    pub async fn list_comments(
        &self,
        post_id: Id<PostMarker>,
        request: ListingRequest,
    ) -> Result<Vec<LikedComment>, ListingError> {
        let page = Page::new(request.offset, request.limit)?;

        let comments = self.repository.fetch_comments(post_id, page).await?;
        Ok(enrich(&self.likes, &self.likes_latency, comments, request.requester).await?)
    }

    /// Decorates a single entity without spawning anything.
    pub async fn decorate<T: Likeable>(
        &self,
        item: T,
        requester: Requester,
    ) -> Result<Liked<T>, KvError> {
        let likes = fetch_likes(
            self.likes.as_ref(),
            &self.likes_latency,
            item.like_target(),
            requester,
        )
        .await?;

        Ok(Liked { item, likes })
    }

    async fn cached_window(&self) -> Result<Option<Vec<LikedPost>>, ListingError> {
        debug!("Probing the listing cache");
        let Some(entry) = self.cache.probe().await.map_err(ListingError::Cache)? else {
            return Ok(None);
        };

        let window = serde_json::from_slice(&entry).map_err(ListingError::Inconsistent)?;
        Ok(Some(window))
    }

    /// Builds the whole front-page window for the anonymous viewer and caches it.
    ///
    /// The window is only written once it is complete, whatever the page that caused the miss.
    async fn refresh_window(&self) -> Result<Vec<LikedPost>, ListingError> {
        let posts = self
            .repository
            .fetch_posts(Page::first(self.config.window))
            .await?;
        let window = enrich(&self.likes, &self.likes_latency, posts, Requester::ANONYMOUS).await?;

        let entry = serde_json::to_vec(&window).map_err(ListingError::Inconsistent)?;
        debug!(cached = window.len(), "Storing the listing window");
        self.cache
            .store(entry, self.config.cache_ttl)
            .await
            .map_err(ListingError::Cache)?;

        Ok(window)
    }
}
