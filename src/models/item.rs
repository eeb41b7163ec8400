use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A pickup line, the relational source of truth for an item document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (UUIDv7), also the search document id
    pub id: Uuid,

    pub title: String,

    pub content: String,

    /// Ids of the owner's tags attached to this item
    pub tag_ids: Vec<Uuid>,

    /// Whether users other than the owner may see the item
    pub visible: bool,

    /// Owner of the item
    pub user_id: Uuid,

    /// Last metadata change, drives time-decay ranking
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Create a new item owned by `user_id`. Tags are expected to be resolved already.
    pub fn new(request: &NewItem, tag_ids: Vec<Uuid>, user_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: request.title.clone(),
            content: request.content.clone(),
            tag_ids,
            visible: request.visible,
            user_id,
            updated_at: Utc::now(),
        }
    }

    /// Apply a metadata update and bump the modification time
    pub fn apply(&mut self, request: &NewItem, tag_ids: Vec<Uuid>) {
        self.title = request.title.clone();
        self.content = request.content.clone();
        self.tag_ids = tag_ids;
        self.visible = request.visible;
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Visible items are public, hidden ones are only seen by their owner
    pub fn can_be_seen_by(&self, user_id: Uuid) -> bool {
        self.visible || self.is_owned_by(user_id)
    }
}

/// Request body for creating or updating an item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewItem {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 1, max = 4096))]
    pub content: String,

    /// Requested tag ids; unknown or foreign tags are dropped
    #[serde(default)]
    pub tags: Vec<Uuid>,

    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}
