//! Likes are kept outside the relational store, as one set of user ids per liked entity.

use crate::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::{Post, PostMarker},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The entity a like set belongs to.
///
/// Ordering sorts by kind first and by id within a kind.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum LikeTarget {
    Post(Id<PostMarker>),
    Comment(Id<CommentMarker>),
}

impl Display for LikeTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LikeTarget::Post(id) => write!(f, "post_{id}"),
            LikeTarget::Comment(id) => write!(f, "comment_{id}"),
        }
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize,
)]
pub struct Likes {
    pub count: i64,
    pub liked_by_requester: bool,
}

/// An entity decorated with its likes, as seen by one requester.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Liked<T> {
    #[serde(flatten)]
    pub item: T,
    pub likes: Likes,
}

pub trait Likeable {
    fn like_target(&self) -> LikeTarget;
}

impl Likeable for Post {
    fn like_target(&self) -> LikeTarget {
        LikeTarget::Post(self.id)
    }
}

impl Likeable for Comment {
    fn like_target(&self) -> LikeTarget {
        LikeTarget::Comment(self.id)
    }
}

impl<T: Likeable> Likeable for Liked<T> {
    fn like_target(&self) -> LikeTarget {
        self.item.like_target()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, like::LikeTarget};

    #[test]
    fn like_target_keys() {
        assert_eq!(LikeTarget::Post(Id::new(12)).to_string(), "post_12");
        assert_eq!(LikeTarget::Comment(Id::new(3)).to_string(), "comment_3");
    }

    #[test]
    fn like_targets_sort_by_id_within_kind() {
        let mut targets = vec![
            LikeTarget::Post(Id::new(10)),
            LikeTarget::Post(Id::new(2)),
            LikeTarget::Post(Id::new(7)),
        ];
        targets.sort();

        assert_eq!(targets, [2, 7, 10].map(|id| LikeTarget::Post(Id::new(id))));
    }
}
