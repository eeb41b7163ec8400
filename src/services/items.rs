//! Item writes and reads across the relational store and the projection

use crate::error::{AppError, Result};
use crate::models::{
    Item, ItemFilters, ItemPage, ItemView, NewItem, Reaction, ReactionRequest, User,
};
use crate::search::{ProjectionService, TagResolver};
use crate::services::saga::{record_dual_write, Saga};
use crate::state::{ItemStore, ReactionStore, Repository, UserStore};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Orchestrates item dual writes; the relational store is always written first
#[derive(Clone)]
pub struct ItemService {
    repository: Arc<dyn Repository>,
    projection: Arc<ProjectionService>,
}

impl ItemService {
    pub fn new(repository: Arc<dyn Repository>, projection: Arc<ProjectionService>) -> Self {
        Self {
            repository,
            projection,
        }
    }

    async fn owner(&self, user_id: Uuid) -> Result<User> {
        self.repository
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// An item the requester owns; other owners' items look missing
    async fn owned_item(&self, item_id: Uuid, requester: Uuid) -> Result<Item> {
        match self.repository.get_item(&item_id).await? {
            Some(item) if item.is_owned_by(requester) => Ok(item),
            _ => Err(AppError::NotFound(format!("Item {} not found", item_id))),
        }
    }

    /// Keep the requested tags that belong to the owner, in request order
    pub async fn resolve_tags(&self, requested: &[Uuid], owner: Uuid) -> Result<Vec<Uuid>> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolver = TagResolver::new(self.repository.as_ref());
        let mut tag_ids: Vec<Uuid> = resolver
            .resolve(requested, owner)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect();
        let mut seen = std::collections::HashSet::new();
        tag_ids.retain(|id| seen.insert(*id));

        if tag_ids.len() < requested.len() {
            tracing::debug!(
                owner = %owner,
                requested = requested.len(),
                kept = tag_ids.len(),
                "Dropped unknown or foreign tags"
            );
        }
        Ok(tag_ids)
    }

    /// Create relationally, then index; indexing failure removes both sides again
    pub async fn create(&self, request: &NewItem, owner_id: Uuid) -> Result<Item> {
        request.validate()?;
        let owner = self.owner(owner_id).await?;
        let tag_ids = self.resolve_tags(&request.tags, owner.id).await?;
        let item = Item::new(request, tag_ids, owner.id);

        let result = self.create_projected(&item, &owner).await;
        record_dual_write("create_item", &result);
        result.map(|()| item)
    }

    async fn create_projected(&self, item: &Item, owner: &User) -> Result<()> {
        self.repository.create_item(item).await?;
        tracing::debug!(item_id = %item.id, "Item stored");

        let mut saga = Saga::new("create_item");
        saga.compensate_with("delete_row", async move {
            self.repository.delete_item(&item.id).await
        });
        saga.compensate_with("delete_document", async move {
            self.projection
                .delete_item(item.id)
                .await
                .map_err(AppError::from)
        });

        saga.step("index_document", async {
            self.projection
                .index_item(item, owner)
                .await
                .map_err(AppError::from)
        })
        .await?;

        tracing::info!(item_id = %item.id, owner = %owner.id, "Item created");
        Ok(())
    }

    /// Update relationally, then merge the metadata into the projection
    ///
    /// A projection failure is returned but not compensated; the relational row keeps the
    /// new values and a reindex restores the document.
    pub async fn update(&self, item_id: Uuid, request: &NewItem, requester: Uuid) -> Result<Item> {
        request.validate()?;
        let mut item = self.owned_item(item_id, requester).await?;
        let tag_ids = self.resolve_tags(&request.tags, requester).await?;
        item.apply(request, tag_ids);

        self.repository.update_item(&item).await?;
        let result = self
            .projection
            .update_item(&item)
            .await
            .map_err(AppError::from);
        if let Err(e) = &result {
            tracing::warn!(item_id = %item.id, error = %e, "Item document is stale after update");
        }
        record_dual_write("update_item", &result);
        result.map(|()| item)
    }

    /// Delete the document first, then the row
    pub async fn delete(&self, item_id: Uuid, requester: Uuid) -> Result<()> {
        let item = self.owned_item(item_id, requester).await?;

        let result = self.delete_projected(&item).await;
        record_dual_write("delete_item", &result);

        if result.is_ok() {
            tracing::info!(item_id = %item.id, "Item deleted");
        }
        result
    }

    async fn delete_projected(&self, item: &Item) -> Result<()> {
        self.projection.delete_item(item.id).await?;
        self.repository.delete_item(&item.id).await
    }

    /// Purge a user's item documents; the relational cascade belongs to the user delete
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = self
            .projection
            .purge_user_items(user_id)
            .await
            .map_err(AppError::from);
        record_dual_write("purge_user_items", &result);
        result
    }

    /// Store the requester's reaction and move the projection counters by script
    ///
    /// Script failures are returned without compensation; the reaction row stays and the
    /// counters drift until the next reindex.
    pub async fn update_reaction(
        &self,
        item_id: Uuid,
        requester: Uuid,
        request: ReactionRequest,
    ) -> Result<Reaction> {
        let item = self
            .repository
            .get_item(&item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

        if !item.can_be_seen_by(requester) {
            return Err(AppError::Validation(format!(
                "Item {} cannot be reacted to",
                item_id
            )));
        }

        let old = self
            .repository
            .get_reaction(&item_id, &requester)
            .await?
            .unwrap_or_else(|| Reaction::neutral(item_id, requester));
        let new = Reaction {
            item_id,
            user_id: requester,
            starred: request.starred,
            vote: request.vote,
        };

        self.repository.upsert_reaction(&new).await?;
        let result = self
            .projection
            .apply_reaction(item_id, requester, &old, &new)
            .await
            .map_err(AppError::from);
        if let Err(e) = &result {
            tracing::warn!(item_id = %item_id, user_id = %requester, error = %e, "Reaction counters diverged");
        }
        record_dual_write("update_reaction", &result);
        result.map(|()| new)
    }

    /// Single item view with statistics aggregated from relational reactions
    pub async fn get(&self, item_id: Uuid, requester: Uuid) -> Result<ItemView> {
        let item = match self.repository.get_item(&item_id).await? {
            Some(item) if item.can_be_seen_by(requester) => item,
            _ => return Err(AppError::NotFound(format!("Item {} not found", item_id))),
        };

        let owner = self.owner(item.user_id).await?;
        let mut resolver = TagResolver::new(self.repository.as_ref());
        let tags = resolver.resolve(&item.tag_ids, item.user_id).await?;
        let reaction = self
            .repository
            .get_reaction(&item.id, &requester)
            .await?
            .unwrap_or_else(|| Reaction::neutral(item.id, requester));
        let statistics = self.repository.get_statistics(&item.id).await?;

        Ok(ItemView {
            id: item.id,
            title: item.title,
            content: item.content,
            tags,
            visible: item.visible,
            owner: owner.summary(),
            updated_at: item.updated_at,
            statistics,
            reaction,
        })
    }

    pub async fn search(&self, filters: &ItemFilters, requester: Uuid) -> Result<ItemPage> {
        filters.validate()?;
        self.projection.search_items(filters, requester).await
    }

    pub async fn feed(&self, filters: &ItemFilters, requester: Uuid) -> Result<ItemPage> {
        filters.validate()?;
        self.projection.feed(filters, requester).await
    }
}
