use crate::server::{Result, ServerError};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::TypedHeader;
use headers::{Header, HeaderName, HeaderValue};
use postboard_common::model::{
    Id,
    user::{Requester, UserMarker},
};
use std::iter;

static X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// The caller's user id. Id 0 stands for an anonymous caller.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct XUserId(i64);

impl Header for XUserId {
    fn name() -> &'static HeaderName {
        &X_USER_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values
            .next()
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|&id| id >= 0)
            .map(XUserId)
            .ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        values.extend(iter::once(HeaderValue::from(self.0)));
    }
}

/// Whoever the request is made on behalf of. A missing `X-User-Id` header is an anonymous
/// requester, a malformed one rejects the request.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct RequestingUser {
    requester: Requester,
}

impl RequestingUser {
    #[must_use]
    pub fn requester(self) -> Requester {
        self.requester
    }

    pub fn logged_in(self) -> Result<Id<UserMarker>> {
        self.requester.user().ok_or(ServerError::NotLoggedIn)
    }

    pub fn ensure_author(self, author: Id<UserMarker>) -> Result<()> {
        if self.logged_in()? == author {
            Ok(())
        } else {
            Err(ServerError::NotAuthor)
        }
    }
}

impl<S> FromRequestParts<S> for RequestingUser
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = Option::<TypedHeader<XUserId>>::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidUserIdHeader)?;

        let requester = header.map_or(Requester::ANONYMOUS, |TypedHeader(XUserId(id))| {
            Requester::new(id)
        });

        Ok(Self { requester })
    }
}
