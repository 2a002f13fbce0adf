use crate::record::{CommentRecord, PostRecord};
use postboard_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentContent, CommentMarker},
    post::{Post, PostContent, PostMarker},
    user::UserMarker,
};
use sqlx::{PgPool, query, query_as};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Client for the relational store.
///
/// Rows are always read in ascending id order, which is insertion order.
#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_posts(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.body,
                users.user_id,
                users.name,
                (
                    SELECT COUNT(*) FROM posts.comments
                    WHERE comments.post_id = posts.post_id
                ) AS comment_count
            FROM
                posts.posts NATURAL JOIN users.users
            ORDER BY
                posts.post_id
            OFFSET $1
            LIMIT $2
            ",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.body,
                users.user_id,
                users.name,
                (
                    SELECT COUNT(*) FROM posts.comments
                    WHERE comments.post_id = posts.post_id
                ) AS comment_count
            FROM
                posts.posts NATURAL JOIN users.users
            WHERE
                posts.post_id = $1
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(&self, author: Id<UserMarker>, content: &PostContent) -> Result<Post> {
        let record = query_as::<_, PostRecord>(
            "
            WITH inserted AS (
                INSERT INTO posts.posts (title, body, user_id)
                VALUES ($1, $2, $3)
                RETURNING post_id, title, body, user_id
            )
            SELECT
                inserted.post_id,
                inserted.title,
                inserted.body,
                users.user_id,
                users.name,
                0::BIGINT AS comment_count
            FROM
                inserted NATURAL JOIN users.users
            ",
        )
        .bind(content.title.get())
        .bind(&content.body)
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(Post::try_from(record)?)
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(
            "
            WITH updated AS (
                UPDATE posts.posts
                SET title = $2, body = $3
                WHERE post_id = $1
                RETURNING post_id, title, body, user_id
            )
            SELECT
                updated.post_id,
                updated.title,
                updated.body,
                users.user_id,
                users.name,
                (
                    SELECT COUNT(*) FROM posts.comments
                    WHERE comments.post_id = updated.post_id
                ) AS comment_count
            FROM
                updated NATURAL JOIN users.users
            ",
        )
        .bind(post_id.get())
        .bind(content.title.get())
        .bind(&content.body)
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Deletes the post together with its comments. Returns whether the post existed.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.posts WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_comments(
        &self,
        post_id: Id<PostMarker>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.body,
                users.user_id,
                users.name
            FROM
                posts.comments NATURAL JOIN users.users
            WHERE
                comments.post_id = $1
            ORDER BY
                comments.comment_id
            OFFSET $2
            LIMIT $3
            ",
        )
        .bind(post_id.get())
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.body,
                users.user_id,
                users.name
            FROM
                posts.comments NATURAL JOIN users.users
            WHERE
                comments.comment_id = $1
            ",
        )
        .bind(comment_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        author: Id<UserMarker>,
        content: &CommentContent,
    ) -> Result<Comment> {
        let record = query_as::<_, CommentRecord>(
            "
            WITH inserted AS (
                INSERT INTO posts.comments (post_id, user_id, body)
                VALUES ($1, $2, $3)
                RETURNING comment_id, post_id, user_id, body
            )
            SELECT
                inserted.comment_id,
                inserted.post_id,
                inserted.body,
                users.user_id,
                users.name
            FROM
                inserted NATURAL JOIN users.users
            ",
        )
        .bind(post_id.get())
        .bind(author.get())
        .bind(&content.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(Comment::try_from(record)?)
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(
            "
            WITH updated AS (
                UPDATE posts.comments
                SET body = $2
                WHERE comment_id = $1
                RETURNING comment_id, post_id, user_id, body
            )
            SELECT
                updated.comment_id,
                updated.post_id,
                updated.body,
                users.user_id,
                users.name
            FROM
                updated NATURAL JOIN users.users
            ",
        )
        .bind(comment_id.get())
        .bind(&content.body)
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = query("DELETE FROM posts.comments WHERE comment_id = $1")
            .bind(comment_id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
