//! Hydration of raw search hits into caller-facing views

use crate::error::Result;
use crate::models::{ItemPage, ItemView, Reaction, Tag, UserPage, UserSummary};
use crate::search::document::{ItemDocument, UserDocument};
use crate::search::engine::{RawHit, RawSearchResponse};
use crate::search::error::SearchError;
use crate::state::{ReactionStore, Repository, TagStore};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-request tag lookup cache keyed by (tag id, owner id)
///
/// Tags are ownership checked, so the same tag id asked for on behalf of a different owner
/// is a separate key. Misses are fetched in one batched call.
pub struct TagResolver<'a> {
    repository: &'a dyn Repository,
    cache: HashMap<(Uuid, Uuid), Tag>,
}

impl<'a> TagResolver<'a> {
    pub fn new(repository: &'a dyn Repository) -> Self {
        Self {
            repository,
            cache: HashMap::new(),
        }
    }

    /// Fetch every key not yet cached
    pub async fn prefetch(&mut self, keys: &[(Uuid, Uuid)]) -> Result<()> {
        let mut missing: Vec<(Uuid, Uuid)> = Vec::new();
        for key in keys {
            if !self.cache.contains_key(key) && !missing.contains(key) {
                missing.push(*key);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        tracing::debug!(count = missing.len(), "Resolving tags");
        for tag in self.repository.find_tags(&missing).await? {
            self.cache.insert(tag.key(), tag);
        }
        Ok(())
    }

    /// Tags of one owner in the requested order; unknown or foreign ids are skipped
    pub async fn resolve(&mut self, tag_ids: &[Uuid], owner: Uuid) -> Result<Vec<Tag>> {
        let keys: Vec<(Uuid, Uuid)> = tag_ids.iter().map(|id| (*id, owner)).collect();
        self.prefetch(&keys).await?;

        Ok(keys
            .iter()
            .filter_map(|key| self.cache.get(key).cloned())
            .collect())
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Merges search hits with relational lookups
#[derive(Clone)]
pub struct Hydrator {
    repository: Arc<dyn Repository>,
}

impl Hydrator {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Build item views: tags through one resolver for the whole page, the requester's
    /// reaction by point lookup, statistics as stored in the projection
    pub async fn items(
        &self,
        response: RawSearchResponse,
        requester: Uuid,
        page: u32,
    ) -> Result<ItemPage> {
        let documents = response
            .hits
            .iter()
            .map(decode_item)
            .collect::<Result<Vec<_>>>()?;

        let mut resolver = TagResolver::new(self.repository.as_ref());
        let keys: Vec<(Uuid, Uuid)> = documents
            .iter()
            .flat_map(|doc| doc.tags.iter().map(move |tag| (*tag, doc.user_id)))
            .collect();
        resolver.prefetch(&keys).await?;

        let mut items = Vec::with_capacity(documents.len());
        for document in documents {
            let tags = resolver.resolve(&document.tags, document.user_id).await?;
            let reaction = self
                .repository
                .get_reaction(&document.id, &requester)
                .await?
                .unwrap_or_else(|| Reaction::neutral(document.id, requester));

            items.push(ItemView {
                id: document.id,
                statistics: document.statistics(),
                owner: document.owner(),
                title: document.title,
                content: document.content,
                tags,
                visible: document.visible,
                updated_at: document.updated_at,
                reaction,
            });
        }

        Ok(ItemPage {
            total: response.total,
            page,
            items,
        })
    }

    /// User views come straight from their documents
    pub fn users(&self, response: RawSearchResponse, page: u32) -> Result<UserPage> {
        let users = response
            .hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value::<UserDocument>(hit.source)
                    .map(UserSummary::from)
                    .map_err(|e| SearchError::Serialization(e.to_string()).into())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(UserPage {
            total: response.total,
            page,
            users,
        })
    }
}

fn decode_item(hit: &RawHit) -> Result<ItemDocument> {
    serde_json::from_value(hit.source.clone()).map_err(|e| {
        SearchError::Serialization(format!("Malformed item document {}: {}", hit.id, e)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Item, NewItem, User, Vote};
    use crate::state::{create_in_memory_store, UserStore};
    use serde_json::json;

    async fn seeded() -> (Arc<dyn Repository>, User, Tag, Tag) {
        let repository = create_in_memory_store();
        let user = User::new("ann@example.com", "Ann");
        repository.create_user(&user).await.unwrap();
        let first = Tag::new("cheesy", "", user.id);
        let second = Tag::new("nerdy", "", user.id);
        repository.create_tag(&first).await.unwrap();
        repository.create_tag(&second).await.unwrap();
        (repository, user, first, second)
    }

    fn hit(item: &Item, owner: &User) -> RawHit {
        RawHit {
            id: item.id.to_string(),
            score: 1.0,
            source: serde_json::to_value(ItemDocument::new(item, owner)).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_resolver_keeps_order_and_drops_foreign_tags() {
        let (repository, user, first, second) = seeded().await;
        let stranger = Uuid::new_v4();
        let mut resolver = TagResolver::new(repository.as_ref());

        let tags = resolver
            .resolve(&[second.id, Uuid::new_v4(), first.id], user.id)
            .await
            .unwrap();
        assert_eq!(tags, vec![second.clone(), first.clone()]);

        let foreign = resolver.resolve(&[first.id], stranger).await.unwrap();
        assert!(foreign.is_empty());
        assert_eq!(resolver.cached(), 2);
    }

    #[tokio::test]
    async fn test_items_use_projection_counters_and_neutral_reaction() {
        let (repository, user, first, second) = seeded().await;
        let request = NewItem {
            title: "Are you wifi".to_string(),
            content: "Because I feel a connection".to_string(),
            tags: vec![first.id, second.id],
            visible: true,
        };
        let item = Item::new(&request, vec![first.id, second.id], user.id);
        let other = Item::new(&request, vec![first.id], user.id);

        let reader = Uuid::new_v4();
        repository
            .upsert_reaction(&Reaction {
                item_id: other.id,
                user_id: reader,
                starred: true,
                vote: Vote::Upvote,
            })
            .await
            .unwrap();

        let hydrator = Hydrator::new(repository);
        let page = hydrator
            .items(
                RawSearchResponse {
                    total: 7,
                    hits: vec![hit(&item, &user), hit(&other, &user)],
                },
                reader,
                1,
            )
            .await
            .unwrap();

        assert_eq!(page.total, 7);
        assert_eq!(page.page, 1);
        assert_eq!(page.items[0].tags.len(), 2);
        assert_eq!(page.items[0].reaction, Reaction::neutral(item.id, reader));
        assert!(page.items[1].reaction.starred);
        // The projection says zero, even though a relational upvote exists.
        assert_eq!(page.items[1].statistics.number_of_successes, 0);
        assert_eq!(page.items[1].owner.username, "ann@example.com");
    }

    #[tokio::test]
    async fn test_malformed_document_is_a_serialization_error() {
        let hydrator = Hydrator::new(create_in_memory_store());
        let response = RawSearchResponse {
            total: 1,
            hits: vec![RawHit {
                id: "broken".to_string(),
                score: 1.0,
                source: json!({ "title": 3 }),
            }],
        };

        let result = hydrator.items(response, Uuid::new_v4(), 0).await;
        assert!(matches!(result, Err(AppError::Serialization(_))));
    }
}
