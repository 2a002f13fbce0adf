//! The stores behind the service: posts and comments, like sets, and the listing cache.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use postboard_common::{
    model::{
        Id,
        comment::{Comment, CommentContent, CommentMarker},
        like::LikeTarget,
        post::{Post, PostContent, PostMarker},
        user::UserMarker,
    },
    util::PositiveDuration,
};
use postboard_db::{
    client::{DbClient, DbError},
    kv::{KvClient, KvError},
};

use crate::listing::Page;

/// Key of the single cache slot holding the front-page window.
pub const LISTING_CACHE_KEY: &str = "cached_posts";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts in ascending id order.
    async fn fetch_posts(&self, page: Page) -> Result<Vec<Post>, DbError>;

    /// Comments of one post in ascending id order.
    async fn fetch_comments(
        &self,
        post_id: Id<PostMarker>,
        page: Page,
    ) -> Result<Vec<Comment>, DbError>;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>, DbError>;

    async fn create_post(
        &self,
        author: Id<UserMarker>,
        content: &PostContent,
    ) -> Result<Post, DbError>;

    /// `None` if the post does not exist.
    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>, DbError>;

    /// Deletes the post and its comments. Returns whether the post existed.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool, DbError>;

    async fn fetch_comment(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>, DbError>;

    async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        content: &CommentContent,
    ) -> Result<Comment, DbError>;

    async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<Option<Comment>, DbError>;

    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool, DbError>;
}

/// One set of user ids per liked entity. An empty set and a missing set are the same thing.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// Returns `false` if the user had already liked the target.
    async fn add(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError>;

    /// Returns `false` if the user had not liked the target.
    async fn remove(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError>;

    async fn cardinality(&self, target: LikeTarget) -> Result<i64, KvError>;

    async fn is_member(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError>;

    async fn delete(&self, target: LikeTarget) -> Result<(), KvError>;
}

/// A single slot with a store-enforced expiry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ListingCache: Send + Sync {
    /// `None` if the slot is empty or has expired.
    async fn probe(&self) -> Result<Option<Vec<u8>>, KvError>;

    async fn store(&self, entry: Vec<u8>, ttl: PositiveDuration) -> Result<(), KvError>;
}

#[async_trait]
impl PostRepository for DbClient {
    async fn fetch_posts(&self, page: Page) -> Result<Vec<Post>, DbError> {
        DbClient::fetch_posts(self, page.offset_i64(), page.limit_i64()).await
    }

    async fn fetch_comments(
        &self,
        post_id: Id<PostMarker>,
        page: Page,
    ) -> Result<Vec<Comment>, DbError> {
        DbClient::fetch_comments(self, post_id, page.offset_i64(), page.limit_i64()).await
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>, DbError> {
        DbClient::fetch_post(self, post_id).await
    }

    async fn create_post(
        &self,
        author: Id<UserMarker>,
        content: &PostContent,
    ) -> Result<Post, DbError> {
        DbClient::create_post(self, author, content).await
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>, DbError> {
        DbClient::update_post(self, post_id, content).await
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool, DbError> {
        DbClient::delete_post(self, post_id).await
    }

    async fn fetch_comment(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>, DbError> {
        DbClient::fetch_comment(self, comment_id).await
    }

    async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        content: &CommentContent,
    ) -> Result<Comment, DbError> {
        DbClient::create_comment(self, post_id, author, content).await
    }

    async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<Option<Comment>, DbError> {
        DbClient::update_comment(self, comment_id, content).await
    }

    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool, DbError> {
        DbClient::delete_comment(self, comment_id).await
    }
}

#[async_trait]
impl LikeStore for KvClient {
    async fn add(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        self.set_add(&target.to_string(), user.get()).await
    }

    async fn remove(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        self.set_remove(&target.to_string(), user.get()).await
    }

    async fn cardinality(&self, target: LikeTarget) -> Result<i64, KvError> {
        self.set_cardinality(&target.to_string()).await
    }

    async fn is_member(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        self.set_is_member(&target.to_string(), user.get()).await
    }

    async fn delete(&self, target: LikeTarget) -> Result<(), KvError> {
        KvClient::delete(self, &target.to_string()).await
    }
}

#[async_trait]
impl ListingCache for KvClient {
    async fn probe(&self) -> Result<Option<Vec<u8>>, KvError> {
        self.get_bytes(LISTING_CACHE_KEY).await
    }

    async fn store(&self, entry: Vec<u8>, ttl: PositiveDuration) -> Result<(), KvError> {
        self.set_bytes_with_ttl(LISTING_CACHE_KEY, &entry, ttl.whole_milliseconds())
            .await
    }
}
