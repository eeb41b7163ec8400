use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Vote a user casts on an item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Vote {
    #[default]
    None,
    Upvote,
    Downvote,
}

/// Canonical per-user reaction to an item, keyed by (item_id, user_id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub starred: bool,
    pub vote: Vote,
}

impl Reaction {
    /// The value reported when a user never reacted to an item
    pub fn neutral(item_id: Uuid, user_id: Uuid) -> Self {
        Self {
            item_id,
            user_id,
            starred: false,
            vote: Vote::None,
        }
    }

    pub fn key(&self) -> (Uuid, Uuid) {
        (self.item_id, self.user_id)
    }
}

/// Body of a reaction update; the item and user come from the route and requester
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRequest {
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub vote: Vote,
}
