use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted book owned by the principal that created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub name: Option<String>,
    pub owner: Option<String>,
}

/// Book about to be inserted. `id` is assigned by the store and `owner` is
/// only ever set by the creation auditor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewBook {
    pub name: Option<String>,
    pub(crate) owner: Option<String>,
}

impl NewBook {
    pub fn new(name: Option<String>) -> Self {
        Self { name, owner: None }
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub(crate) fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// Attach the store-assigned id
    pub fn into_book(self, id: i64) -> Book {
        Book {
            id,
            name: self.name,
            owner: self.owner,
        }
    }
}

/// POST /books request body. Unknown fields such as `id`, `owner` or `user`
/// are accepted and dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<BookPayload> for NewBook {
    fn from(payload: BookPayload) -> Self {
        NewBook::new(payload.name)
    }
}
