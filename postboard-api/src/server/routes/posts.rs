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
    like::{LikeTarget, Liked, Likes},
    post::{LikedPost, Post, PostContent, PostMarker},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_get(get_post)
        .typed_post(create_post)
        .typed_post(edit_post)
        .typed_post(delete_post)
        .typed_post(like_post)
        .typed_post(dislike_post)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct PostsResponse {
    posts: Vec<LikedPost>,
}

/// Fetches the post or fails with a 404.
async fn existing_post(repository: &dyn PostRepository, id: Id<PostMarker>) -> Result<Post> {
    repository
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(listing): State<Arc<ListingService>>,
    user: RequestingUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<PostsResponse>> {
    let posts = listing.list_posts(page.request(user.requester())).await?;

    Ok(Json(PostsResponse { posts }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(repository): State<Arc<dyn PostRepository>>,
    State(listing): State<Arc<ListingService>>,
    user: RequestingUser,
) -> Result<Json<LikedPost>> {
    let post = existing_post(repository.as_ref(), id).await?;
    let post = listing.decorate(post, user.requester()).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(repository): State<Arc<dyn PostRepository>>,
    user: RequestingUser,
    Json(content): Json<PostContent>,
) -> Result<Json<LikedPost>> {
    let author = user.logged_in()?;
    let post = repository.create_post(author, &content).await?;
    debug!(id = %post.id, %author, "Created post");

    Ok(Json(Liked {
        item: post,
        likes: Likes::default(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit", rejection(ServerError))]
struct EditPostPath {
    id: Id<PostMarker>,
}

async fn edit_post(
    EditPostPath { id }: EditPostPath,
    State(repository): State<Arc<dyn PostRepository>>,
    State(listing): State<Arc<ListingService>>,
    user: RequestingUser,
    Json(content): Json<PostContent>,
) -> Result<Json<LikedPost>> {
    let post = existing_post(repository.as_ref(), id).await?;
    user.ensure_author(post.author.id)?;

    let post = repository
        .update_post(id, &content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    let post = listing.decorate(post, user.requester()).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/delete", rejection(ServerError))]
struct DeletePostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    DeletePostPath { id }: DeletePostPath,
    State(repository): State<Arc<dyn PostRepository>>,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    let post = existing_post(repository.as_ref(), id).await?;
    user.ensure_author(post.author.id)?;

    if !repository.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }
    likes.delete(LikeTarget::Post(id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: Id<PostMarker>,
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    like(likes.as_ref(), LikeTarget::Post(id), user).await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/dislike", rejection(ServerError))]
struct DislikePostPath {
    id: Id<PostMarker>,
}

async fn dislike_post(
    DislikePostPath { id }: DislikePostPath,
    State(likes): State<Arc<dyn LikeStore>>,
    user: RequestingUser,
) -> Result<StatusCode> {
    dislike(likes.as_ref(), LikeTarget::Post(id), user).await
}
