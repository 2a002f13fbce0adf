use postboard_common::model::{
    ModelValidationError,
    comment::Comment,
    post::{Post, PostContent, PostTitle},
    user::{User, UserName},
};
use sqlx::FromRow;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub name: String,
    pub comment_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub body: String,
    pub user_id: i64,
    pub name: String,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            author: User {
                id: value.user_id.into(),
                name: UserName::new(value.name)?,
            },
            content: PostContent {
                title: PostTitle::new(value.title)?,
                body: value.body,
            },
            comment_count: value.comment_count,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.into(),
            post_id: value.post_id.into(),
            author: User {
                id: value.user_id.into(),
                name: UserName::new(value.name)?,
            },
            body: value.body,
        })
    }
}
