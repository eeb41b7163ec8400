use crate::error::{AppError, Result};
use crate::models::{Item, Reaction, Tag, User};
use crate::state::{ItemStore, ReactionStore, TagStore, UserStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory relational store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    users: Arc<DashMap<Uuid, User>>,
    tags: Arc<DashMap<Uuid, Tag>>,
    items: Arc<DashMap<Uuid, Item>>,
    reactions: Arc<DashMap<(Uuid, Uuid), Reaction>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            tags: Arc::new(DashMap::new()),
            items: Arc::new(DashMap::new()),
            reactions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let taken = self
            .users
            .iter()
            .any(|entry| entry.username == user.username);
        if taken {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                user.username
            )));
        }

        self.users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "User saved");
        Ok(())
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        if self.users.contains_key(&user.id) {
            self.users.insert(user.id, user.clone());
            tracing::debug!(user_id = %user.id, "User updated");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {} not found", user.id)))
        }
    }

    async fn delete_user(&self, id: &Uuid) -> Result<()> {
        if self.users.remove(id).is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        let owned: HashSet<Uuid> = self
            .items
            .iter()
            .filter(|entry| entry.user_id == *id)
            .map(|entry| entry.id)
            .collect();
        self.items.retain(|item_id, _| !owned.contains(item_id));
        self.tags.retain(|_, tag| tag.user_id != *id);
        self.reactions
            .retain(|(item_id, user_id), _| user_id != id && !owned.contains(item_id));

        tracing::debug!(user_id = %id, items = owned.len(), "User deleted with cascade");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.users.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[async_trait]
impl TagStore for InMemoryStore {
    async fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.tags.insert(tag.id, tag.clone());
        tracing::debug!(tag_id = %tag.id, "Tag saved");
        Ok(())
    }

    async fn get_tag(&self, id: &Uuid) -> Result<Option<Tag>> {
        Ok(self.tags.get(id).map(|entry| entry.clone()))
    }

    async fn update_tag(&self, tag: &Tag) -> Result<()> {
        if self.tags.contains_key(&tag.id) {
            self.tags.insert(tag.id, tag.clone());
            tracing::debug!(tag_id = %tag.id, "Tag updated");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Tag {} not found", tag.id)))
        }
    }

    async fn delete_tag(&self, id: &Uuid) -> Result<()> {
        if self.tags.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }

        for mut item in self.items.iter_mut() {
            item.tag_ids.retain(|tag_id| tag_id != id);
        }

        tracing::debug!(tag_id = %id, "Tag deleted");
        Ok(())
    }

    async fn find_tags(&self, keys: &[(Uuid, Uuid)]) -> Result<Vec<Tag>> {
        Ok(keys
            .iter()
            .filter_map(|(tag_id, owner_id)| {
                self.tags
                    .get(tag_id)
                    .filter(|tag| tag.user_id == *owner_id)
                    .map(|tag| tag.clone())
            })
            .collect())
    }

    async fn list_tags_for_user(&self, user_id: &Uuid) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .tags
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .map(|entry| entry.value().clone())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn create_item(&self, item: &Item) -> Result<()> {
        self.items.insert(item.id, item.clone());
        tracing::debug!(item_id = %item.id, "Item saved");
        Ok(())
    }

    async fn get_item(&self, id: &Uuid) -> Result<Option<Item>> {
        Ok(self.items.get(id).map(|entry| entry.clone()))
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        if self.items.contains_key(&item.id) {
            self.items.insert(item.id, item.clone());
            tracing::debug!(item_id = %item.id, "Item updated");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Item {} not found", item.id)))
        }
    }

    async fn delete_item(&self, id: &Uuid) -> Result<()> {
        if self.items.remove(id).is_none() {
            return Err(AppError::NotFound(format!("Item {} not found", id)));
        }

        self.reactions.retain(|(item_id, _), _| item_id != id);
        tracing::debug!(item_id = %id, "Item deleted");
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.items.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[async_trait]
impl ReactionStore for InMemoryStore {
    async fn get_reaction(&self, item_id: &Uuid, user_id: &Uuid) -> Result<Option<Reaction>> {
        Ok(self
            .reactions
            .get(&(*item_id, *user_id))
            .map(|entry| entry.clone()))
    }

    async fn upsert_reaction(&self, reaction: &Reaction) -> Result<()> {
        self.reactions.insert(reaction.key(), reaction.clone());
        tracing::debug!(
            item_id = %reaction.item_id,
            user_id = %reaction.user_id,
            vote = %reaction.vote,
            starred = reaction.starred,
            "Reaction saved"
        );
        Ok(())
    }

    async fn list_reactions(&self, item_id: &Uuid) -> Result<Vec<Reaction>> {
        Ok(self
            .reactions
            .iter()
            .filter(|entry| entry.key().0 == *item_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewItem, Vote};

    fn item_for(user: &User, tag_ids: Vec<Uuid>) -> Item {
        let request = NewItem {
            title: "Do you have a map?".to_string(),
            content: "I keep getting lost in your eyes".to_string(),
            tags: tag_ids.clone(),
            visible: true,
        };
        Item::new(&request, tag_ids, user.id)
    }

    #[tokio::test]
    async fn test_username_is_unique() {
        let store = InMemoryStore::new();
        store
            .create_user(&User::new("a@example.com", "A"))
            .await
            .unwrap();

        let result = store.create_user(&User::new("a@example.com", "B")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_tags_checks_owner() {
        let store = InMemoryStore::new();
        let owner = Uuid::now_v7();
        let tag = Tag::new("cheesy", "", owner);
        store.create_tag(&tag).await.unwrap();

        let found = store
            .find_tags(&[(tag.id, owner), (tag.id, Uuid::now_v7()), (Uuid::now_v7(), owner)])
            .await
            .unwrap();
        assert_eq!(found, vec![tag]);
    }

    #[tokio::test]
    async fn test_delete_tag_detaches_from_items() {
        let store = InMemoryStore::new();
        let user = User::new("a@example.com", "A");
        let tag = Tag::new("cheesy", "", user.id);
        let item = item_for(&user, vec![tag.id]);
        store.create_user(&user).await.unwrap();
        store.create_tag(&tag).await.unwrap();
        store.create_item(&item).await.unwrap();

        store.delete_tag(&tag.id).await.unwrap();

        let item = store.get_item(&item.id).await.unwrap().unwrap();
        assert!(item.tag_ids.is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = InMemoryStore::new();
        let author = User::new("author@example.com", "Author");
        let fan = User::new("fan@example.com", "Fan");
        let tag = Tag::new("smooth", "", author.id);
        let item = item_for(&author, vec![tag.id]);
        store.create_user(&author).await.unwrap();
        store.create_user(&fan).await.unwrap();
        store.create_tag(&tag).await.unwrap();
        store.create_item(&item).await.unwrap();
        store
            .upsert_reaction(&Reaction {
                item_id: item.id,
                user_id: fan.id,
                starred: true,
                vote: Vote::Upvote,
            })
            .await
            .unwrap();

        store.delete_user(&author.id).await.unwrap();

        assert!(store.get_item(&item.id).await.unwrap().is_none());
        assert!(store.get_tag(&tag.id).await.unwrap().is_none());
        assert!(store.list_reactions(&item.id).await.unwrap().is_empty());
        assert!(store.get_user(&fan.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_statistics_aggregation() {
        let store = InMemoryStore::new();
        let item_id = Uuid::now_v7();
        for vote in [Vote::Upvote, Vote::Downvote, Vote::Upvote, Vote::None] {
            store
                .upsert_reaction(&Reaction {
                    item_id,
                    user_id: Uuid::now_v7(),
                    starred: false,
                    vote,
                })
                .await
                .unwrap();
        }

        let stats = store.get_statistics(&item_id).await.unwrap();
        assert_eq!(stats.number_of_successes, 2);
        assert_eq!(stats.number_of_failures, 1);
        assert_eq!(stats.number_of_tries, 3);
        assert_eq!(stats.success_percentage, 0.67);
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = InMemoryStore::new();
        let item = item_for(&User::new("a@example.com", "A"), vec![]);
        let result = store.update_item(&item).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
