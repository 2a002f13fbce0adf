use crate::listing::{
    ListingConfig, ListingError, ListingErrorKind, ListingService,
    metrics::LikesLatency,
    store::{LikeStore, ListingCache, PostRepository},
};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use postboard_common::model::{Id, comment::CommentMarker, like::LikeTarget, post::PostMarker};
use postboard_db::{
    client::{DbClient, DbError},
    kv::{KvClient, KvError},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub repository: Arc<dyn PostRepository>,
    pub likes: Arc<dyn LikeStore>,
    pub listing: Arc<ListingService>,
}

impl ServerState {
    /// Wires everything onto Postgres for posts and comments, and Redis for likes and the cache.
    #[must_use]
    pub fn new(
        db_client: DbClient,
        kv_client: KvClient,
        config: ListingConfig,
        likes_latency: LikesLatency,
    ) -> Self {
        let repository: Arc<dyn PostRepository> = Arc::new(db_client);
        let kv_client = Arc::new(kv_client);
        let listing = ListingService::new(
            Arc::clone(&repository),
            Arc::clone(&kv_client) as Arc<dyn LikeStore>,
            Arc::clone(&kv_client) as Arc<dyn ListingCache>,
            config,
            likes_latency,
        );

        Self {
            repository,
            likes: kv_client,
            listing: Arc::new(listing),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("X-User-Id header was invalid: {0}")]
    InvalidUserIdHeader(TypedHeaderRejection),
    #[error("The requester is not logged in")]
    NotLoggedIn,
    #[error("The requester is not the author")]
    NotAuthor,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    KeyValue(#[from] KvError),
    #[error(transparent)]
    Listing(#[from] ListingError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("{0} was already liked by the requester")]
    AlreadyLiked(LikeTarget),
    #[error("{0} was not liked by the requester")]
    NotLiked(LikeTarget),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::NotLoggedIn => StatusCode::UNAUTHORIZED,
            ServerError::NotAuthor => StatusCode::FORBIDDEN,
            ServerError::AlreadyLiked(_) | ServerError::NotLiked(_) => StatusCode::CONFLICT,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidUserIdHeader(_) => StatusCode::BAD_REQUEST,
            ServerError::Listing(err) if err.kind() == ListingErrorKind::InvalidArgument => {
                StatusCode::BAD_REQUEST
            }
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::KeyValue(_)
            | ServerError::Listing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
