use crate::error::{AppError, Result};
use crate::models::{Item, Reaction, Tag, User};
use crate::state::{ItemStore, ReactionStore, TagStore, UserStore};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent relational store using the Sled embedded database
///
/// Reactions are keyed by `item_id ++ user_id`, so one item's reactions are a prefix scan.
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    users_tree: sled::Tree,
    tags_tree: sled::Tree,
    items_tree: sled::Tree,
    reactions_tree: sled::Tree,
}

fn db_error(context: &'static str) -> impl Fn(sled::Error) -> AppError {
    move |e| AppError::Database(format!("{}: {}", context, e))
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref();
        let db = sled::open(path_str).map_err(db_error("Failed to open Sled database"))?;

        let users_tree = db
            .open_tree("users")
            .map_err(db_error("Failed to open users tree"))?;
        let tags_tree = db
            .open_tree("tags")
            .map_err(db_error("Failed to open tags tree"))?;
        let items_tree = db
            .open_tree("items")
            .map_err(db_error("Failed to open items tree"))?;
        let reactions_tree = db
            .open_tree("reactions")
            .map_err(db_error("Failed to open reactions tree"))?;

        tracing::info!("Initialized Sled store at {:?}", path_str);

        Ok(Self {
            db: Arc::new(db),
            users_tree,
            tags_tree,
            items_tree,
            reactions_tree,
        })
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize record: {}", e)))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Serialization(format!("Failed to deserialize record: {}", e)))
    }

    fn reaction_key(item_id: &Uuid, user_id: &Uuid) -> Vec<u8> {
        let mut key = item_id.as_bytes().to_vec();
        key.extend_from_slice(user_id.as_bytes());
        key
    }

    fn get<T: DeserializeOwned>(tree: &sled::Tree, id: &Uuid) -> Result<Option<T>> {
        match tree.get(id.as_bytes()).map_err(db_error("Failed to read record"))? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> Result<()> {
        tree.insert(key, Self::encode(value)?)
            .map_err(db_error("Failed to write record"))?;
        tree.flush().map_err(db_error("Failed to flush tree"))?;
        Ok(())
    }

    fn replace<T: Serialize>(tree: &sled::Tree, id: &Uuid, value: &T, kind: &str) -> Result<()> {
        let exists = tree
            .contains_key(id.as_bytes())
            .map_err(db_error("Failed to check record existence"))?;
        if !exists {
            return Err(AppError::NotFound(format!("{} {} not found", kind, id)));
        }
        Self::put(tree, id.as_bytes(), value)
    }

    fn remove(tree: &sled::Tree, id: &Uuid, kind: &str) -> Result<()> {
        let removed = tree
            .remove(id.as_bytes())
            .map_err(db_error("Failed to delete record"))?;
        if removed.is_none() {
            return Err(AppError::NotFound(format!("{} {} not found", kind, id)));
        }
        Ok(())
    }

    fn scan<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
        tree.iter()
            .values()
            .map(|value| {
                let bytes = value.map_err(db_error("Failed to scan tree"))?;
                Self::decode(&bytes)
            })
            .collect()
    }

    fn remove_reactions_where(&self, predicate: impl Fn(&Reaction) -> bool) -> Result<usize> {
        let mut removed = 0;
        for entry in self.reactions_tree.iter() {
            let (key, value) = entry.map_err(db_error("Failed to scan reactions"))?;
            let reaction: Reaction = Self::decode(&value)?;
            if predicate(&reaction) {
                self.reactions_tree
                    .remove(key)
                    .map_err(db_error("Failed to delete reaction"))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl UserStore for SledStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        if self.get_user_by_username(&user.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                user.username
            )));
        }

        Self::put(&self.users_tree, user.id.as_bytes(), user)?;
        tracing::debug!(user_id = %user.id, "User saved to Sled");
        Ok(())
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        Self::get(&self.users_tree, id)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users: Vec<User> = Self::scan(&self.users_tree)?;
        Ok(users.into_iter().find(|user| user.username == username))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        Self::replace(&self.users_tree, &user.id, user, "User")?;
        tracing::debug!(user_id = %user.id, "User updated in Sled");
        Ok(())
    }

    async fn delete_user(&self, id: &Uuid) -> Result<()> {
        Self::remove(&self.users_tree, id, "User")?;

        let items: Vec<Item> = Self::scan(&self.items_tree)?;
        let owned: HashSet<Uuid> = items
            .iter()
            .filter(|item| item.user_id == *id)
            .map(|item| item.id)
            .collect();
        for item_id in &owned {
            Self::remove(&self.items_tree, item_id, "Item")?;
        }

        let tags: Vec<Tag> = Self::scan(&self.tags_tree)?;
        for tag in tags.iter().filter(|tag| tag.user_id == *id) {
            Self::remove(&self.tags_tree, &tag.id, "Tag")?;
        }

        let reactions = self.remove_reactions_where(|reaction| {
            reaction.user_id == *id || owned.contains(&reaction.item_id)
        })?;

        self.db
            .flush()
            .map_err(db_error("Failed to flush database"))?;

        tracing::debug!(
            user_id = %id,
            items = owned.len(),
            reactions = reactions,
            "User deleted from Sled with cascade"
        );
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Self::scan(&self.users_tree)
    }
}

#[async_trait]
impl TagStore for SledStore {
    async fn create_tag(&self, tag: &Tag) -> Result<()> {
        Self::put(&self.tags_tree, tag.id.as_bytes(), tag)?;
        tracing::debug!(tag_id = %tag.id, "Tag saved to Sled");
        Ok(())
    }

    async fn get_tag(&self, id: &Uuid) -> Result<Option<Tag>> {
        Self::get(&self.tags_tree, id)
    }

    async fn update_tag(&self, tag: &Tag) -> Result<()> {
        Self::replace(&self.tags_tree, &tag.id, tag, "Tag")?;
        tracing::debug!(tag_id = %tag.id, "Tag updated in Sled");
        Ok(())
    }

    async fn delete_tag(&self, id: &Uuid) -> Result<()> {
        Self::remove(&self.tags_tree, id, "Tag")?;

        let items: Vec<Item> = Self::scan(&self.items_tree)?;
        for mut item in items.into_iter().filter(|item| item.tag_ids.contains(id)) {
            item.tag_ids.retain(|tag_id| tag_id != id);
            Self::put(&self.items_tree, item.id.as_bytes(), &item)?;
        }

        tracing::debug!(tag_id = %id, "Tag deleted from Sled");
        Ok(())
    }

    async fn find_tags(&self, keys: &[(Uuid, Uuid)]) -> Result<Vec<Tag>> {
        let mut tags = Vec::with_capacity(keys.len());
        for (tag_id, owner_id) in keys {
            if let Some(tag) = Self::get::<Tag>(&self.tags_tree, tag_id)? {
                if tag.user_id == *owner_id {
                    tags.push(tag);
                }
            }
        }
        Ok(tags)
    }

    async fn list_tags_for_user(&self, user_id: &Uuid) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Self::scan::<Tag>(&self.tags_tree)?
            .into_iter()
            .filter(|tag| tag.user_id == *user_id)
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Self::scan(&self.tags_tree)
    }
}

#[async_trait]
impl ItemStore for SledStore {
    async fn create_item(&self, item: &Item) -> Result<()> {
        Self::put(&self.items_tree, item.id.as_bytes(), item)?;
        tracing::debug!(item_id = %item.id, "Item saved to Sled");
        Ok(())
    }

    async fn get_item(&self, id: &Uuid) -> Result<Option<Item>> {
        Self::get(&self.items_tree, id)
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        Self::replace(&self.items_tree, &item.id, item, "Item")?;
        tracing::debug!(item_id = %item.id, "Item updated in Sled");
        Ok(())
    }

    async fn delete_item(&self, id: &Uuid) -> Result<()> {
        Self::remove(&self.items_tree, id, "Item")?;

        for entry in self.reactions_tree.scan_prefix(id.as_bytes()) {
            let (key, _) = entry.map_err(db_error("Failed to scan reactions"))?;
            self.reactions_tree
                .remove(key)
                .map_err(db_error("Failed to delete reaction"))?;
        }
        self.db
            .flush()
            .map_err(db_error("Failed to flush database"))?;

        tracing::debug!(item_id = %id, "Item deleted from Sled");
        Ok(())
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        Self::scan(&self.items_tree)
    }
}

#[async_trait]
impl ReactionStore for SledStore {
    async fn get_reaction(&self, item_id: &Uuid, user_id: &Uuid) -> Result<Option<Reaction>> {
        let key = Self::reaction_key(item_id, user_id);
        match self
            .reactions_tree
            .get(key)
            .map_err(db_error("Failed to read reaction"))?
        {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn upsert_reaction(&self, reaction: &Reaction) -> Result<()> {
        let key = Self::reaction_key(&reaction.item_id, &reaction.user_id);
        Self::put(&self.reactions_tree, &key, reaction)?;
        tracing::debug!(
            item_id = %reaction.item_id,
            user_id = %reaction.user_id,
            vote = %reaction.vote,
            starred = reaction.starred,
            "Reaction saved to Sled"
        );
        Ok(())
    }

    async fn list_reactions(&self, item_id: &Uuid) -> Result<Vec<Reaction>> {
        self.reactions_tree
            .scan_prefix(item_id.as_bytes())
            .values()
            .map(|value| {
                let bytes = value.map_err(db_error("Failed to scan reactions"))?;
                Self::decode(&bytes)
            })
            .collect()
    }
}
