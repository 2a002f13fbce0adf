use crate::{
    listing::{
        ListingService,
        store::{LikeStore, PostRepository},
    },
    server::{
        Result, ServerError, ServerRouter,
        auth::RequestingUser,
        json::Json,
        query::Query,
        routes::{PageQuery, dislike, like},
    },
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use postboard_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker, LikedComment},
    like::{LikeTarget, Liked, Likes},
    post::PostMarker,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_post(edit_comment)
        .typed_post(delete_comment)
        .typed_post(like_comment)
        .typed_post(dislike_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct CommentsResponse {
    comments: Vec<LikedComment>,
}

async fn existing_comment(
    repository: &dyn PostRepository,
    id: Id<CommentMarker>,
) -> Result<Comment> {
    repository
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct ListCommentsPath {
    id: Id<PostMarker>,
}

async fn list_comments(
    ListCommentsPath { id }: ListCommentsPath,
    State(listing): State<Arc<ListingService>>,
    user: RequestingUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<CommentsResponse>> {
    let comments = listing
        .list_comments(id, page.request(user.requester()))
        .await?;

    Ok(Json(CommentsResponse { comments }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/create", rejection(ServerError))]
struct CreateCommentPath {
    id: Id<PostMarker>,
}

async fn create_comment(
    CreateCommentPath { id }: CreateCommentPath,
    State(repository): State<Arc<dyn PostRepository>>,
    user: RequestingUser,
    Json(content): Json<CommentContent>,
) -> Result<Json<LikedComment>> {
    let author = user.logged_in()?;
    if repository.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    let comment = repository.create_comment(id, author, &content).await?;
    debug!(id = %comment.id, post_id = %id, %author, "Created comment");

    Ok(Json(Liked {
        item: comment,
        likes: Likes::default(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/edit", rejection(ServerError))]
struct EditCommentPath {
    id: Id<CommentMarker>,
}

async fn edit_comment(
    EditCommentPath { id }: EditCommentPath,
    State(repository): State<Arc<dyn PostRepository>>,
    State(listing): State<Arc<ListingService>>,
    user: RequestingUser,
    Json(content): Json<CommentContent>,
) -> Result<Json<LikedComment>> {
    let comment = existing_comment(repository.as_ref(), id).await?;
    user.ensure_author(comment.author.id)?;

    let comment = repository
        .update_comment(id, &content)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    let comment = listing.decorate(comment, user.requester()).await?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/delete", rejection(ServerError))]
struct DeleteCommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    DeleteCommentPath { id }: DeleteCommentPath,
    State(repository): State<Arc<dyn PostRepository>>,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    let comment = existing_comment(repository.as_ref(), id).await?;
    user.ensure_author(comment.author.id)?;

    if !repository.delete_comment(id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }
    likes.delete(LikeTarget::Comment(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/like", rejection(ServerError))]
struct LikeCommentPath {
    id: Id<CommentMarker>,
}

async fn like_comment(
    LikeCommentPath { id }: LikeCommentPath,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    like(likes.as_ref(), LikeTarget::Comment(id), user).await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/dislike", rejection(ServerError))]
struct DislikeCommentPath {
    id: Id<CommentMarker>,
}

async fn dislike_comment(
    DislikeCommentPath { id }: DislikeCommentPath,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    dislike(likes.as_ref(), LikeTarget::Comment(id), user).await
}
