//! In-memory stores for exercising the listing path without Postgres or Redis.

use crate::listing::{
    ListingConfig, ListingService, Page,
    metrics::{LikesLatency, testing::discarded_latency},
    store::{LikeStore, ListingCache, PostRepository},
};
use async_trait::async_trait;
use postboard_common::{
    model::{
        Id,
        comment::{Comment, CommentContent, CommentMarker},
        like::LikeTarget,
        post::{Post, PostContent, PostMarker, PostTitle},
        user::{User, UserMarker, UserName},
    },
    util::PositiveDuration,
};
use postboard_db::{client::DbError, kv::KvError};
use std::{
    collections::{BTreeSet, HashMap},
    num::NonZeroU64,
    sync::{Arc, Mutex},
};
use time::Duration;

pub fn kv_error() -> KvError {
    KvError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

pub fn db_error() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

/// Author of every fixture post.
pub const POST_AUTHOR: i64 = 1;
/// Author of every fixture comment.
pub const COMMENT_AUTHOR: i64 = 2;

fn user(id: i64) -> User {
    let name = match id {
        POST_AUTHOR => "Alex Rusin".to_owned(),
        COMMENT_AUTHOR => "Bob Johnson".to_owned(),
        _ => format!("User {id}"),
    };

    User {
        id: Id::new(id),
        name: UserName::new(name).unwrap(),
    }
}

pub fn post(id: i64) -> Post {
    Post {
        id: Id::new(id),
        author: user(POST_AUTHOR),
        content: PostContent {
            title: PostTitle::new(format!("Title {id}")).unwrap(),
            body: format!("Body {id}"),
        },
        comment_count: id % 3,
    }
}

pub fn comment(id: i64, post_id: i64) -> Comment {
    Comment {
        id: Id::new(id),
        post_id: Id::new(post_id),
        author: user(COMMENT_AUTHOR),
        body: format!("Comment {id}"),
    }
}

pub fn config() -> ListingConfig {
    ListingConfig {
        window: NonZeroU64::new(30).unwrap(),
        cache_ttl: PositiveDuration::try_from(Duration::seconds(5)).unwrap(),
    }
}

/// Posts, comments, like sets and the cache slot, all behind one lock each.
///
/// The cache slot only empties when [`MemoryStore::expire_cache`] is called.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: Mutex<Vec<Post>>,
    comments: Mutex<Vec<Comment>>,
    likes: Mutex<HashMap<LikeTarget, BTreeSet<i64>>>,
    cache: Mutex<Option<Vec<u8>>>,
    post_fetches: Mutex<Vec<Page>>,
    cache_writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_posts(ids: impl IntoIterator<Item = i64>) -> Arc<Self> {
        let store = Self::default();
        *store.posts.lock().unwrap() = ids.into_iter().map(post).collect();
        Arc::new(store)
    }

    pub fn add_comment(&self, comment: Comment) {
        self.comments.lock().unwrap().push(comment);
    }

    pub fn like(&self, target: LikeTarget, user: i64) {
        self.likes
            .lock()
            .unwrap()
            .entry(target)
            .or_default()
            .insert(user);
    }

    pub fn expire_cache(&self) {
        *self.cache.lock().unwrap() = None;
    }

    pub fn set_cache(&self, entry: Vec<u8>) {
        *self.cache.lock().unwrap() = Some(entry);
    }

    pub fn is_cached(&self) -> bool {
        self.cache.lock().unwrap().is_some()
    }

    pub fn post_fetches(&self) -> Vec<Page> {
        self.post_fetches.lock().unwrap().clone()
    }

    pub fn cache_writes(&self) -> usize {
        *self.cache_writes.lock().unwrap()
    }

    pub fn has_post(&self, id: i64) -> bool {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .any(|post| post.id.get() == id)
    }

    pub fn service(self: &Arc<Self>) -> ListingService {
        self.service_with_latency(discarded_latency())
    }

    pub fn service_with_latency(self: &Arc<Self>, likes_latency: LikesLatency) -> ListingService {
        ListingService::new(
            Arc::clone(self) as Arc<dyn PostRepository>,
            Arc::clone(self) as Arc<dyn LikeStore>,
            Arc::clone(self) as Arc<dyn ListingCache>,
            config(),
            likes_latency,
        )
    }
}

fn paginate<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    page.slice(items.to_vec())
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn fetch_posts(&self, page: Page) -> Result<Vec<Post>, DbError> {
        self.post_fetches.lock().unwrap().push(page);
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by_key(|post| post.id);

        Ok(paginate(&posts, page))
    }

    async fn fetch_comments(
        &self,
        post_id: Id<PostMarker>,
        page: Page,
    ) -> Result<Vec<Comment>, DbError> {
        let mut comments: Vec<_> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| comment.id);

        Ok(paginate(&comments, page))
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>, DbError> {
        let posts = self.posts.lock().unwrap();

        Ok(posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn create_post(
        &self,
        author: Id<UserMarker>,
        content: &PostContent,
    ) -> Result<Post, DbError> {
        let mut posts = self.posts.lock().unwrap();
        let id = posts.iter().map(|post| post.id.get()).max().unwrap_or(0) + 1;
        let post = Post {
            id: Id::new(id),
            author: user(author.get()),
            content: content.clone(),
            comment_count: 0,
        };
        posts.push(post.clone());

        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>, DbError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts.iter_mut().find(|post| post.id == post_id).map(|post| {
            post.content = content.clone();
            post.clone()
        });

        Ok(post)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool, DbError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|post| post.id != post_id);
        self.comments
            .lock()
            .unwrap()
            .retain(|comment| comment.post_id != post_id);

        Ok(posts.len() < before)
    }

    async fn fetch_comment(
        &self,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>, DbError> {
        let comments = self.comments.lock().unwrap();

        Ok(comments.iter().find(|comment| comment.id == comment_id).cloned())
    }

    async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        content: &CommentContent,
    ) -> Result<Comment, DbError> {
        let mut comments = self.comments.lock().unwrap();
        let id = comments.iter().map(|comment| comment.id.get()).max().unwrap_or(0) + 1;
        let comment = Comment {
            id: Id::new(id),
            post_id,
            author: user(author.get()),
            body: content.body.clone(),
        };
        comments.push(comment.clone());

        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<Option<Comment>, DbError> {
        let mut comments = self.comments.lock().unwrap();
        let comment = comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .map(|comment| {
                comment.body.clone_from(&content.body);
                comment.clone()
            });

        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool, DbError> {
        let mut comments = self.comments.lock().unwrap();
        let before = comments.len();
        comments.retain(|comment| comment.id != comment_id);

        Ok(comments.len() < before)
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn add(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .entry(target)
            .or_default()
            .insert(user.get()))
    }

    async fn remove(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .get_mut(&target)
            .is_some_and(|set| set.remove(&user.get())))
    }

    async fn cardinality(&self, target: LikeTarget) -> Result<i64, KvError> {
        let likes = self.likes.lock().unwrap();
        let count = likes.get(&target).map_or(0, BTreeSet::len);

        Ok(i64::try_from(count).unwrap())
    }

    async fn is_member(&self, target: LikeTarget, user: Id<UserMarker>) -> Result<bool, KvError> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .get(&target)
            .is_some_and(|set| set.contains(&user.get())))
    }

    async fn delete(&self, target: LikeTarget) -> Result<(), KvError> {
        self.likes.lock().unwrap().remove(&target);
        Ok(())
    }
}

#[async_trait]
impl ListingCache for MemoryStore {
    async fn probe(&self) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.cache.lock().unwrap().clone())
    }

    async fn store(&self, entry: Vec<u8>, _ttl: PositiveDuration) -> Result<(), KvError> {
        *self.cache.lock().unwrap() = Some(entry);
        *self.cache_writes.lock().unwrap() += 1;
        Ok(())
    }
}
