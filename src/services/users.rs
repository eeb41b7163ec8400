//! User writes mirrored into the user index

use crate::error::{AppError, Result};
use crate::models::{DisplayNameRequest, NewUser, User, UserFilters, UserPage};
use crate::search::ProjectionService;
use crate::services::saga::{record_dual_write, Saga};
use crate::state::{Repository, UserStore};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn Repository>,
    projection: Arc<ProjectionService>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository>, projection: Arc<ProjectionService>) -> Self {
        Self {
            repository,
            projection,
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        self.repository
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Register a user; the row is removed again if indexing fails
    pub async fn create(&self, request: &NewUser) -> Result<User> {
        request.validate()?;
        let user = User::new(request.username.trim(), request.display_name.trim());
        user.validate()?;

        let result = self.create_projected(&user).await;
        record_dual_write("create_user", &result);
        result.map(|()| user)
    }

    async fn create_projected(&self, user: &User) -> Result<()> {
        self.repository.create_user(user).await?;

        let mut saga = Saga::new("create_user");
        saga.compensate_with("delete_row", async move {
            self.repository.delete_user(&user.id).await
        });
        saga.step("index_document", async {
            self.projection.index_user(user).await.map_err(AppError::from)
        })
        .await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    pub async fn search(&self, filters: &UserFilters) -> Result<UserPage> {
        self.projection.search_users(filters).await
    }

    /// Rename relationally, then merge the user document
    pub async fn update_display_name(
        &self,
        user_id: Uuid,
        request: &DisplayNameRequest,
    ) -> Result<User> {
        request.validate()?;
        let mut user = self.get(user_id).await?;
        user.display_name = request.display_name.trim().to_string();
        user.validate()?;

        self.repository.update_user(&user).await?;
        let result = self
            .projection
            .update_user(&user)
            .await
            .map_err(AppError::from);
        record_dual_write("update_user", &result);
        result.map(|()| user)
    }

    /// Cascade relationally, then drop the user document and every item document
    pub async fn delete(&self, user_id: Uuid) -> Result<()> {
        let user = self.get(user_id).await?;

        let result = self.delete_projected(&user).await;
        record_dual_write("delete_user", &result);
        result
    }

    async fn delete_projected(&self, user: &User) -> Result<()> {
        self.repository.delete_user(&user.id).await?;
        self.projection.delete_user(user.id).await?;
        let purged = self.projection.purge_user_items(user.id).await?;

        tracing::info!(user_id = %user.id, purged, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{InMemorySearchEngine, SearchBackend, SearchConfigBuilder};

    async fn fixture() -> (Arc<InMemorySearchEngine>, UserService) {
        let engine = Arc::new(InMemorySearchEngine::new());
        let repository = crate::state::create_in_memory_store();
        let config = SearchConfigBuilder::new()
            .backend(SearchBackend::InMemory)
            .build();
        let projection = Arc::new(ProjectionService::new(engine.clone(), config, repository.clone()));
        projection.ensure_indices().await.unwrap();
        (engine, UserService::new(repository, projection))
    }

    fn new_user(username: &str, display_name: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            display_name: display_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_display_name() {
        let (engine, users) = fixture().await;
        let user = users
            .create(&new_user("casanova@example.com", ""))
            .await
            .unwrap();

        assert_eq!(user.display_name, "casanova@example.com");
        let doc = engine.document("users", &user.id.to_string()).unwrap();
        assert_eq!(doc["display_name"], "casanova@example.com");
    }

    #[tokio::test]
    async fn test_invalid_username_is_rejected() {
        let (engine, users) = fixture().await;
        let result = users.create(&new_user("not-an-email", "x")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(engine.document_count("users"), 0);
    }

    #[tokio::test]
    async fn test_rename_and_delete() {
        let (engine, users) = fixture().await;
        let user = users.create(&new_user("a@example.com", "A")).await.unwrap();

        let renamed = users
            .update_display_name(
                user.id,
                &DisplayNameRequest {
                    display_name: "Alpha".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "Alpha");
        let doc = engine.document("users", &user.id.to_string()).unwrap();
        assert_eq!(doc["display_name"], "Alpha");

        users.delete(user.id).await.unwrap();
        assert!(engine.document("users", &user.id.to_string()).is_none());
        assert!(matches!(users.get(user.id).await, Err(AppError::NotFound(_))));
    }
}
