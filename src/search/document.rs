//! Search document projections of relational entities

use crate::models::{Item, Reaction, Statistics, Tag, User, UserSummary, Vote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field names shared by documents, mappings, queries and scripts
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const TAGS: &str = "tags";
    pub const USER_ID: &str = "userId";
    pub const USERNAME: &str = "username";
    pub const DISPLAY_NAME: &str = "display_name";
    pub const NAME: &str = "name";
    pub const VISIBLE: &str = "visible";
    pub const STARRED_BY_USER: &str = "starredByUser";
    pub const UPVOTED_BY_USER: &str = "upvotedByUser";
    pub const DOWNVOTED_BY_USER: &str = "downvotedByUser";
    pub const NUMBER_OF_SUCCESSES: &str = "numberOfSuccesses";
    pub const NUMBER_OF_FAILURES: &str = "numberOfFailures";
    pub const NUMBER_OF_TRIES: &str = "numberOfTries";
    pub const SUCCESS_PERCENTAGE: &str = "successPercentage";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Full projection of an item, written on create and on reindex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDocument {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<Uuid>,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub visible: bool,
    #[serde(rename = "starredByUser", default)]
    pub starred_by_user: Vec<Uuid>,
    #[serde(rename = "upvotedByUser", default)]
    pub upvoted_by_user: Vec<Uuid>,
    #[serde(rename = "downvotedByUser", default)]
    pub downvoted_by_user: Vec<Uuid>,
    #[serde(rename = "numberOfSuccesses", default)]
    pub number_of_successes: u64,
    #[serde(rename = "numberOfFailures", default)]
    pub number_of_failures: u64,
    #[serde(rename = "numberOfTries", default)]
    pub number_of_tries: u64,
    #[serde(rename = "successPercentage", default)]
    pub success_percentage: f64,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl ItemDocument {
    /// Project a freshly created item; counters start at zero and membership sets empty
    pub fn new(item: &Item, owner: &User) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            content: item.content.clone(),
            tags: item.tag_ids.clone(),
            user_id: owner.id,
            username: owner.username.clone(),
            display_name: owner.display_name.clone(),
            visible: item.visible,
            starred_by_user: Vec::new(),
            upvoted_by_user: Vec::new(),
            downvoted_by_user: Vec::new(),
            number_of_successes: 0,
            number_of_failures: 0,
            number_of_tries: 0,
            success_percentage: 0.0,
            updated_at: item.updated_at,
        }
    }

    /// Project an existing item with counters and membership sets derived from its reactions
    pub fn rebuilt(item: &Item, owner: &User, reactions: &[Reaction]) -> Self {
        let mut document = Self::new(item, owner);
        for reaction in reactions {
            if reaction.starred {
                document.starred_by_user.push(reaction.user_id);
            }
            match reaction.vote {
                Vote::Upvote => document.upvoted_by_user.push(reaction.user_id),
                Vote::Downvote => document.downvoted_by_user.push(reaction.user_id),
                Vote::None => {}
            }
        }
        document.set_statistics(Statistics::from_reactions(reactions));
        document
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            number_of_successes: self.number_of_successes,
            number_of_failures: self.number_of_failures,
            number_of_tries: self.number_of_tries,
            success_percentage: self.success_percentage,
        }
    }

    fn set_statistics(&mut self, statistics: Statistics) {
        self.number_of_successes = statistics.number_of_successes;
        self.number_of_failures = statistics.number_of_failures;
        self.number_of_tries = statistics.number_of_tries;
        self.success_percentage = statistics.success_percentage;
    }

    pub fn owner(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Partial projection applied on metadata updates. Counters and membership sets are
/// deliberately absent so a document merge never overwrites script-maintained fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUpdateDocument {
    pub title: String,
    pub content: String,
    pub tags: Vec<Uuid>,
    pub visible: bool,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<&Item> for ItemUpdateDocument {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            content: item.content.clone(),
            tags: item.tag_ids.clone(),
            visible: item.visible,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDocument {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

impl From<&Tag> for TagDocument {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name.clone(),
            user_id: tag.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserDocument {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

impl From<UserDocument> for UserSummary {
    fn from(document: UserDocument) -> Self {
        Self {
            id: document.id,
            username: document.username,
            display_name: document.display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewItem;

    fn fixture() -> (Item, User) {
        let owner = User::new("owner@example.com", "Owner");
        let request = NewItem {
            title: "Is your name Google?".to_string(),
            content: "You have everything I've been searching for".to_string(),
            tags: vec![],
            visible: true,
        };
        let item = Item::new(&request, vec![Uuid::now_v7()], owner.id);
        (item, owner)
    }

    #[test]
    fn test_full_projection_field_names() {
        let (item, owner) = fixture();
        let value = serde_json::to_value(ItemDocument::new(&item, &owner)).unwrap();

        assert_eq!(value[fields::USER_ID], owner.id.to_string());
        assert_eq!(value[fields::USERNAME], "owner@example.com");
        assert_eq!(value[fields::DISPLAY_NAME], "Owner");
        assert_eq!(value[fields::NUMBER_OF_TRIES], 0);
        assert_eq!(value[fields::STARRED_BY_USER], serde_json::json!([]));
        assert!(value.get(fields::UPDATED_AT).is_some());
    }

    #[test]
    fn test_partial_projection_excludes_counters() {
        let (item, _) = fixture();
        let value = serde_json::to_value(ItemUpdateDocument::from(&item)).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["content", "tags", "title", "updatedAt", "visible"]);
    }

    #[test]
    fn test_rebuilt_document_derives_counters() {
        let (item, owner) = fixture();
        let fan = Uuid::now_v7();
        let critic = Uuid::now_v7();
        let reactions = vec![
            Reaction {
                item_id: item.id,
                user_id: fan,
                starred: true,
                vote: Vote::Upvote,
            },
            Reaction {
                item_id: item.id,
                user_id: critic,
                starred: false,
                vote: Vote::Downvote,
            },
        ];

        let document = ItemDocument::rebuilt(&item, &owner, &reactions);

        assert_eq!(document.starred_by_user, vec![fan]);
        assert_eq!(document.upvoted_by_user, vec![fan]);
        assert_eq!(document.downvoted_by_user, vec![critic]);
        assert_eq!(document.number_of_tries, 2);
        assert_eq!(document.success_percentage, 0.5);
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let (item, owner) = fixture();
        let mut value = serde_json::to_value(ItemDocument::new(&item, &owner)).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove(fields::NUMBER_OF_SUCCESSES);
        object.remove(fields::UPVOTED_BY_USER);

        let document: ItemDocument = serde_json::from_value(value).unwrap();
        assert_eq!(document.number_of_successes, 0);
        assert!(document.upvoted_by_user.is_empty());
    }
}
