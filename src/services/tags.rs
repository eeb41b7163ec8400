//! Tag writes mirrored into the tag index

use crate::error::{AppError, Result};
use crate::models::{Tag, TagRequest};
use crate::search::ProjectionService;
use crate::services::saga::{record_dual_write, Saga};
use crate::state::{Repository, TagStore, UserStore};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct TagService {
    repository: Arc<dyn Repository>,
    projection: Arc<ProjectionService>,
}

impl TagService {
    pub fn new(repository: Arc<dyn Repository>, projection: Arc<ProjectionService>) -> Self {
        Self {
            repository,
            projection,
        }
    }

    async fn owned_tag(&self, tag_id: Uuid, requester: Uuid) -> Result<Tag> {
        match self.repository.get_tag(&tag_id).await? {
            Some(tag) if tag.user_id == requester => Ok(tag),
            _ => Err(AppError::NotFound(format!("Tag {} not found", tag_id))),
        }
    }

    /// Create the row, then the document; an indexing failure deletes the row again
    pub async fn create(&self, request: &TagRequest, owner: Uuid) -> Result<Tag> {
        request.validate()?;
        if self.repository.get_user(&owner).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", owner)));
        }

        let tag = Tag::new(request.name.trim(), request.description.clone(), owner);
        let result = self.create_projected(&tag).await;
        record_dual_write("create_tag", &result);
        result.map(|()| tag)
    }

    async fn create_projected(&self, tag: &Tag) -> Result<()> {
        self.repository.create_tag(tag).await?;

        let mut saga = Saga::new("create_tag");
        saga.compensate_with("delete_row", async move {
            self.repository.delete_tag(&tag.id).await
        });
        saga.step("index_document", async {
            self.projection.index_tag(tag).await.map_err(AppError::from)
        })
        .await?;

        tracing::info!(tag_id = %tag.id, owner = %tag.user_id, "Tag created");
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Tag>> {
        self.repository.list_tags_for_user(&user_id).await
    }

    /// Update the row, then merge the document; no compensation
    pub async fn update(&self, tag_id: Uuid, request: &TagRequest, requester: Uuid) -> Result<Tag> {
        request.validate()?;
        let mut tag = self.owned_tag(tag_id, requester).await?;
        tag.name = request.name.trim().to_string();
        tag.description = request.description.clone();

        self.repository.update_tag(&tag).await?;
        let result = self
            .projection
            .update_tag(&tag)
            .await
            .map_err(AppError::from);
        record_dual_write("update_tag", &result);
        result.map(|()| tag)
    }

    /// Delete the document, ignoring failures, then the row
    pub async fn delete(&self, tag_id: Uuid, requester: Uuid) -> Result<()> {
        let tag = self.owned_tag(tag_id, requester).await?;

        if let Err(e) = self.projection.delete_tag(tag.id).await {
            tracing::warn!(tag_id = %tag.id, error = %e, "Ignoring tag document delete failure");
        }

        let result = self.repository.delete_tag(&tag.id).await;
        record_dual_write("delete_tag", &result);
        result
    }
}
