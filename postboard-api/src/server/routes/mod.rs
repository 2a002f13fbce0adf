use crate::{
    listing::{ListingRequest, store::LikeStore},
    server::{Result, ServerError, ServerRouter, auth::RequestingUser},
};
use axum::{Router, http::StatusCode};
use postboard_common::model::{like::LikeTarget, user::Requester};
use serde::Deserialize;
use tracing::debug;

mod comments;
mod posts;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(comments::routes())
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct PageQuery {
    offset: i64,
    limit: i64,
}

impl PageQuery {
    fn request(self, requester: Requester) -> ListingRequest {
        ListingRequest {
            offset: self.offset,
            limit: self.limit,
            requester,
        }
    }
}

async fn like(
    likes: &dyn LikeStore,
    target: LikeTarget,
    user: RequestingUser,
) -> Result<StatusCode> {
    let user_id = user.logged_in()?;

    debug!(%target, %user_id, "Adding like");
    if likes.add(target, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::AlreadyLiked(target))
    }
}

async fn dislike(
    likes: &dyn LikeStore,
    target: LikeTarget,
    user: RequestingUser,
) -> Result<StatusCode> {
    let user_id = user.logged_in()?;

    debug!(%target, %user_id, "Removing like");
    if likes.remove(target, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotLiked(target))
    }
}
