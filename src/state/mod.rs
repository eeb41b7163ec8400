pub mod store;
pub mod sled_store;
pub mod factory;

pub use store::*;
pub use sled_store::SledStore;
pub use factory::{create_store, create_in_memory_store};

use crate::error::Result;
use crate::models::{Item, Reaction, Statistics, Tag, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Relational storage for users
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Save a new user; usernames are unique
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID
    async fn get_user(&self, id: &Uuid) -> Result<Option<User>>;

    /// Get a user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Update a user
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user together with their items, tags and reactions
    async fn delete_user(&self, id: &Uuid) -> Result<()>;

    /// List every user
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Relational storage for tags
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn create_tag(&self, tag: &Tag) -> Result<()>;

    async fn get_tag(&self, id: &Uuid) -> Result<Option<Tag>>;

    async fn update_tag(&self, tag: &Tag) -> Result<()>;

    /// Delete a tag and detach it from every item
    async fn delete_tag(&self, id: &Uuid) -> Result<()>;

    /// Batched ownership-checked lookup by (tag id, owner id); unmatched keys are skipped
    async fn find_tags(&self, keys: &[(Uuid, Uuid)]) -> Result<Vec<Tag>>;

    async fn list_tags_for_user(&self, user_id: &Uuid) -> Result<Vec<Tag>>;

    async fn list_tags(&self) -> Result<Vec<Tag>>;
}

/// Relational storage for items
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn create_item(&self, item: &Item) -> Result<()>;

    async fn get_item(&self, id: &Uuid) -> Result<Option<Item>>;

    async fn update_item(&self, item: &Item) -> Result<()>;

    /// Delete an item and its reactions
    async fn delete_item(&self, id: &Uuid) -> Result<()>;

    async fn list_items(&self) -> Result<Vec<Item>>;
}

/// Relational storage for reactions, the ground truth for statistics
#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn get_reaction(&self, item_id: &Uuid, user_id: &Uuid) -> Result<Option<Reaction>>;

    /// Insert or replace the reaction for its (item, user) key
    async fn upsert_reaction(&self, reaction: &Reaction) -> Result<()>;

    async fn list_reactions(&self, item_id: &Uuid) -> Result<Vec<Reaction>>;

    /// Aggregate reactions of one item by vote
    async fn get_statistics(&self, item_id: &Uuid) -> Result<Statistics> {
        let reactions = self.list_reactions(item_id).await?;
        Ok(Statistics::from_reactions(&reactions))
    }
}

/// The full relational collaborator used by the services
pub trait Repository: UserStore + TagStore + ItemStore + ReactionStore {}

impl<T> Repository for T where T: UserStore + TagStore + ItemStore + ReactionStore {}
