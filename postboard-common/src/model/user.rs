use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const USER_NAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: UserName,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user name is invalid: {0}")]
pub struct InvalidUserNameError(String);

impl UserName {
    pub fn new(name: String) -> Result<Self, InvalidUserNameError> {
        if name.chars().count() <= USER_NAME_MAX_LEN {
            Ok(UserName(name))
        } else {
            Err(InvalidUserNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for UserName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserName"))
    }
}

/// The user a request is made on behalf of.
///
/// User id 0 is reserved for anonymous callers: they never like anything and nothing is
/// recorded for them.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Requester(Option<Id<UserMarker>>);

impl Requester {
    pub const ANONYMOUS: Self = Self(None);

    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self((user_id != 0).then_some(Id::new(user_id)))
    }

    #[must_use]
    pub fn user(self) -> Option<Id<UserMarker>> {
        self.0
    }

    #[must_use]
    pub fn is_anonymous(self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn raw(self) -> i64 {
        self.0.map_or(0, Id::get)
    }
}

impl From<Id<UserMarker>> for Requester {
    fn from(value: Id<UserMarker>) -> Self {
        Self::new(value.get())
    }
}
