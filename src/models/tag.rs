use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A user-owned label attached to items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Tag {
    /// Unique identifier (UUIDv7)
    pub id: Uuid,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    pub description: String,

    /// Owner of the tag; tags are only attachable to the owner's items
    pub user_id: Uuid,
}

impl Tag {
    pub fn new(name: impl Into<String>, description: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: description.into(),
            user_id,
        }
    }

    /// Composite key used for batched ownership-checked lookups
    pub fn key(&self) -> (Uuid, Uuid) {
        (self.id, self.user_id)
    }
}

/// Body of tag create and update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(default)]
    pub description: String,
}
