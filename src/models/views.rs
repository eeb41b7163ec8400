use crate::models::{Reaction, Statistics, Tag, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hydrated item as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<Tag>,
    pub visible: bool,
    pub owner: UserSummary,
    pub updated_at: DateTime<Utc>,
    /// Projection counters in search results, relational aggregate in the detail view
    pub statistics: Statistics,
    /// The requester's own reaction
    pub reaction: Reaction,
}

/// One page of item search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    pub total: u64,
    pub page: u32,
    pub items: Vec<ItemView>,
}

/// One page of user search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub total: u64,
    pub page: u32,
    pub users: Vec<UserSummary>,
}
