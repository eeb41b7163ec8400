//! Search execution facade over the projection indices

use crate::error::Result;
use crate::metrics::{self, REACTION_SCRIPT_UPDATES_TOTAL};
use crate::models::{
    Item, ItemFilters, ItemPage, Reaction, Tag, User, UserFilters, UserPage, Visibility,
};
use crate::search::config::SearchConfig;
use crate::search::document::{fields, ItemDocument, ItemUpdateDocument, TagDocument, UserDocument};
use crate::search::engine::SearchEngine;
use crate::search::error::SearchResult;
use crate::search::hydrate::Hydrator;
use crate::search::index::{IndexKind, IndexManager};
use crate::search::query::{
    apply_item_filters, apply_user_filters, BoolQueryBuilder, Query, QueryBuilder, SearchRequest,
};
use crate::search::ranking::apply_sorting;
use crate::search::script::ReactionScript;
use crate::state::Repository;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Reads from and writes to the projection indices
///
/// Every method talks to the search engine only. Ordering against the relational store is
/// the caller's concern, see [`crate::services`].
pub struct ProjectionService {
    engine: Arc<dyn SearchEngine>,
    indices: IndexManager,
    config: SearchConfig,
    hydrator: Hydrator,
}

impl ProjectionService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        config: SearchConfig,
        repository: Arc<dyn Repository>,
    ) -> Self {
        let indices = IndexManager::new(engine.clone(), config.indices.clone());
        Self {
            engine,
            indices,
            config,
            hydrator: Hydrator::new(repository),
        }
    }

    /// Create missing indices; the server must not start when this fails
    pub async fn ensure_indices(&self) -> SearchResult<()> {
        self.indices.ensure_indices().await
    }

    fn index(&self, kind: IndexKind) -> &str {
        self.indices.name(kind)
    }

    async fn observe<T, F>(&self, kind: IndexKind, operation: &'static str, call: F) -> SearchResult<T>
    where
        F: Future<Output = SearchResult<T>>,
    {
        let index = self.index(kind);
        let start = Instant::now();
        let result = call.await;
        metrics::record_search_request(
            index,
            operation,
            metrics::status_label(&result),
            start.elapsed(),
        );

        match &result {
            Ok(_) => tracing::debug!(index = %index, operation, "Search operation completed"),
            Err(e) => tracing::error!(index = %index, operation, error = %e, "Search operation failed"),
        }
        result
    }

    fn new_builder(&self) -> BoolQueryBuilder {
        let mut builder = BoolQueryBuilder::new();
        if let Some(minimum) = self.config.minimum_should_match {
            builder.set_minimum_should_match(minimum);
        }
        builder
    }

    /// Filters, visibility rules and ranking for one page of items
    pub fn build_item_query(&self, filters: &ItemFilters, requester: Uuid) -> SearchRequest {
        let mut builder = self.new_builder();
        apply_item_filters(&mut builder, filters, requester);
        apply_sorting(&mut builder, filters.sorting);
        SearchRequest::page(builder.build(), filters.page, self.config.page_size)
    }

    pub fn build_user_query(&self, filters: &UserFilters) -> SearchRequest {
        let mut builder = self.new_builder();
        apply_user_filters(&mut builder, filters);
        SearchRequest::page(builder.build(), filters.page, self.config.page_size)
    }

    pub async fn search_items(&self, filters: &ItemFilters, requester: Uuid) -> Result<ItemPage> {
        let request = self.build_item_query(filters, requester);
        let response = self
            .observe(
                IndexKind::Items,
                "search",
                self.engine.search(self.index(IndexKind::Items), &request),
            )
            .await?;

        self.hydrator.items(response, requester, filters.page).await
    }

    /// Item search restricted to visible items regardless of the requested visibility
    pub async fn feed(&self, filters: &ItemFilters, requester: Uuid) -> Result<ItemPage> {
        let mut filters = filters.clone();
        filters.visibility = Some(Visibility::Visible);
        self.search_items(&filters, requester).await
    }

    pub async fn search_users(&self, filters: &UserFilters) -> Result<UserPage> {
        let request = self.build_user_query(filters);
        let response = self
            .observe(
                IndexKind::Users,
                "search",
                self.engine.search(self.index(IndexKind::Users), &request),
            )
            .await?;

        self.hydrator.users(response, filters.page)
    }

    async fn put<D: Serialize>(&self, kind: IndexKind, id: Uuid, document: &D) -> SearchResult<()> {
        let document = serde_json::to_value(document)?;
        let id = id.to_string();
        self.observe(
            kind,
            "index",
            self.engine.index_document(self.index(kind), &id, &document),
        )
        .await
    }

    async fn merge<D: Serialize>(&self, kind: IndexKind, id: Uuid, partial: &D) -> SearchResult<()> {
        let partial = serde_json::to_value(partial)?;
        let id = id.to_string();
        self.observe(
            kind,
            "update",
            self.engine.update_document(self.index(kind), &id, &partial),
        )
        .await
    }

    async fn remove(&self, kind: IndexKind, id: Uuid) -> SearchResult<()> {
        let id = id.to_string();
        self.observe(
            kind,
            "delete",
            self.engine.delete_document(self.index(kind), &id),
        )
        .await
    }

    /// Write the full projection of a new item
    pub async fn index_item(&self, item: &Item, owner: &User) -> SearchResult<()> {
        self.put(IndexKind::Items, item.id, &ItemDocument::new(item, owner))
            .await
    }

    /// Replace an item document with one derived from its relational reactions
    pub async fn reindex_item(
        &self,
        item: &Item,
        owner: &User,
        reactions: &[Reaction],
    ) -> SearchResult<()> {
        self.put(
            IndexKind::Items,
            item.id,
            &ItemDocument::rebuilt(item, owner, reactions),
        )
        .await
    }

    /// Merge item metadata, leaving counters and membership sets alone
    pub async fn update_item(&self, item: &Item) -> SearchResult<()> {
        self.merge(IndexKind::Items, item.id, &ItemUpdateDocument::from(item))
            .await
    }

    pub async fn delete_item(&self, item_id: Uuid) -> SearchResult<()> {
        self.remove(IndexKind::Items, item_id).await
    }

    /// Remove every item document owned by a user
    pub async fn purge_user_items(&self, user_id: Uuid) -> SearchResult<u64> {
        let query = Query::term(fields::USER_ID, user_id.to_string());
        let deleted = self
            .observe(
                IndexKind::Items,
                "delete_by_query",
                self.engine
                    .delete_by_query(self.index(IndexKind::Items), &query),
            )
            .await?;

        tracing::info!(user_id = %user_id, deleted, "Purged item documents");
        Ok(deleted)
    }

    /// Apply a reaction transition to the item's counters as one scripted update
    pub async fn apply_reaction(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        old: &Reaction,
        new: &Reaction,
    ) -> SearchResult<()> {
        let script = ReactionScript::for_transition(user_id, old, new);
        let id = item_id.to_string();
        let result = self
            .observe(
                IndexKind::Items,
                "script",
                self.engine
                    .update_by_script(self.index(IndexKind::Items), &id, &script),
            )
            .await;

        REACTION_SCRIPT_UPDATES_TOTAL
            .with_label_values(&[metrics::status_label(&result)])
            .inc();
        result
    }

    pub async fn index_tag(&self, tag: &Tag) -> SearchResult<()> {
        self.put(IndexKind::Tags, tag.id, &TagDocument::from(tag)).await
    }

    pub async fn update_tag(&self, tag: &Tag) -> SearchResult<()> {
        self.merge(IndexKind::Tags, tag.id, &TagDocument::from(tag)).await
    }

    pub async fn delete_tag(&self, tag_id: Uuid) -> SearchResult<()> {
        self.remove(IndexKind::Tags, tag_id).await
    }

    pub async fn index_user(&self, user: &User) -> SearchResult<()> {
        self.put(IndexKind::Users, user.id, &UserDocument::from(user))
            .await
    }

    pub async fn update_user(&self, user: &User) -> SearchResult<()> {
        self.merge(IndexKind::Users, user.id, &UserDocument::from(user))
            .await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> SearchResult<()> {
        self.remove(IndexKind::Users, user_id).await
    }
}
