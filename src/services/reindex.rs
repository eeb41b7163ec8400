//! Full rebuild of the projection from the relational store

use crate::error::Result;
use crate::search::ProjectionService;
use crate::state::{ItemStore, ReactionStore, Repository, TagStore, UserStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Counts of documents written by a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
    pub users: usize,
    pub tags: usize,
    pub items: usize,
    /// Items whose owner row is missing
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Re-projects every relational row, recovering from drift left by uncompensated failures
#[derive(Clone)]
pub struct Reindexer {
    repository: Arc<dyn Repository>,
    projection: Arc<ProjectionService>,
}

impl Reindexer {
    pub fn new(repository: Arc<dyn Repository>, projection: Arc<ProjectionService>) -> Self {
        Self {
            repository,
            projection,
        }
    }

    /// Overwrite every document; item counters are recomputed from reaction rows
    pub async fn rebuild(&self) -> Result<ReindexReport> {
        let start = Instant::now();
        let mut report = ReindexReport::default();
        self.projection.ensure_indices().await?;

        let users = self.repository.list_users().await?;
        for user in &users {
            self.projection.index_user(user).await?;
            report.users += 1;
        }
        let owners: HashMap<_, _> = users.iter().map(|user| (user.id, user)).collect();

        for tag in self.repository.list_tags().await? {
            self.projection.index_tag(&tag).await?;
            report.tags += 1;
        }

        for item in self.repository.list_items().await? {
            let Some(owner) = owners.get(&item.user_id) else {
                tracing::warn!(item_id = %item.id, owner = %item.user_id, "Skipping item without owner");
                report.skipped += 1;
                continue;
            };

            let reactions = self.repository.list_reactions(&item.id).await?;
            self.projection
                .reindex_item(&item, owner, &reactions)
                .await?;
            report.items += 1;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            users = report.users,
            tags = report.tags,
            items = report.items,
            skipped = report.skipped,
            duration_ms = report.duration_ms,
            "Projection rebuilt"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, NewItem, Reaction, User, Vote};
    use crate::search::{InMemorySearchEngine, SearchBackend, SearchConfigBuilder};

    #[tokio::test]
    async fn test_rebuild_recomputes_counters() {
        let engine = Arc::new(InMemorySearchEngine::new());
        let repository = crate::state::create_in_memory_store();
        let config = SearchConfigBuilder::new()
            .backend(SearchBackend::InMemory)
            .build();
        let projection = Arc::new(ProjectionService::new(
            engine.clone(),
            config,
            repository.clone(),
        ));

        let owner = User::new("owner@example.com", "");
        repository.create_user(&owner).await.unwrap();
        let request = NewItem {
            title: "Do you have a map".to_string(),
            content: "I keep getting lost in your eyes".to_string(),
            tags: Vec::new(),
            visible: true,
        };
        let item = Item::new(&request, Vec::new(), owner.id);
        repository.create_item(&item).await.unwrap();
        for vote in [Vote::Upvote, Vote::Upvote, Vote::Downvote] {
            repository
                .upsert_reaction(&Reaction {
                    item_id: item.id,
                    user_id: uuid::Uuid::new_v4(),
                    starred: false,
                    vote,
                })
                .await
                .unwrap();
        }

        let report = Reindexer::new(repository, projection)
            .rebuild()
            .await
            .unwrap();
        assert_eq!(report.users, 1);
        assert_eq!(report.items, 1);

        let doc = engine
            .document("pickup_lines", &item.id.to_string())
            .unwrap();
        assert_eq!(doc["numberOfSuccesses"], 2);
        assert_eq!(doc["numberOfFailures"], 1);
        assert_eq!(doc["numberOfTries"], 3);
        assert_eq!(doc["successPercentage"], 0.67);
        assert_eq!(doc["upvotedByUser"].as_array().unwrap().len(), 2);
    }
}
