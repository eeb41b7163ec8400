//! Shared fixtures and fault-injecting wrappers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use playbook::{
    error::{AppError, Result},
    models::{Item, NewItem, Reaction, Statistics, Tag, User},
    search::{
        InMemorySearchEngine, ProjectionService, Query, RawSearchResponse, ReactionScript,
        SearchBackend, SearchConfigBuilder, SearchEngine, SearchError, SearchRequest,
        SearchResult,
    },
    services::{ItemService, TagService, UserService},
    state::{InMemoryStore, ItemStore, ReactionStore, Repository, TagStore, UserStore},
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub const ITEMS: &str = "pickup_lines";
pub const TAGS: &str = "tags";
pub const USERS: &str = "users";

/// Search engine whose writes can be made to fail, recording every call
#[derive(Default)]
pub struct FaultyEngine {
    pub inner: InMemorySearchEngine,
    pub fail_index: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_script: AtomicBool,
    pub fail_delete: AtomicBool,
    pub calls: Mutex<Vec<String>>,
}

impl FaultyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn check(flag: &AtomicBool, what: &str) -> SearchResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for FaultyEngine {
    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        self.inner.index_exists(index).await
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> SearchResult<()> {
        self.inner.create_index(index, mappings).await
    }

    async fn index_document(&self, index: &str, id: &str, document: &Value) -> SearchResult<()> {
        self.record(format!("index {}/{}", index, id));
        Self::check(&self.fail_index, "index")?;
        self.inner.index_document(index, id, document).await
    }

    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> SearchResult<()> {
        self.record(format!("update {}/{}", index, id));
        Self::check(&self.fail_update, "update")?;
        self.inner.update_document(index, id, partial).await
    }

    async fn update_by_script(
        &self,
        index: &str,
        id: &str,
        script: &ReactionScript,
    ) -> SearchResult<()> {
        self.record(format!("script {}/{}", index, id));
        Self::check(&self.fail_script, "script")?;
        self.inner.update_by_script(index, id, script).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> SearchResult<()> {
        self.record(format!("delete {}/{}", index, id));
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete_document(index, id).await
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> SearchResult<u64> {
        self.record(format!("delete_by_query {}", index));
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete_by_query(index, query).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
        self.inner.search(index, request).await
    }
}

/// Relational store whose item writes can be made to fail, recording item deletes
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    pub fail_create_item: AtomicBool,
    pub fail_delete_item: AtomicBool,
    pub deleted_items: Mutex<Vec<Uuid>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for FaultyStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.inner.update_user(user).await
    }

    async fn delete_user(&self, id: &Uuid) -> Result<()> {
        self.inner.delete_user(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users().await
    }
}

#[async_trait]
impl TagStore for FaultyStore {
    async fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.inner.create_tag(tag).await
    }

    async fn get_tag(&self, id: &Uuid) -> Result<Option<Tag>> {
        self.inner.get_tag(id).await
    }

    async fn update_tag(&self, tag: &Tag) -> Result<()> {
        self.inner.update_tag(tag).await
    }

    async fn delete_tag(&self, id: &Uuid) -> Result<()> {
        self.inner.delete_tag(id).await
    }

    async fn find_tags(&self, keys: &[(Uuid, Uuid)]) -> Result<Vec<Tag>> {
        self.inner.find_tags(keys).await
    }

    async fn list_tags_for_user(&self, user_id: &Uuid) -> Result<Vec<Tag>> {
        self.inner.list_tags_for_user(user_id).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.inner.list_tags().await
    }
}

#[async_trait]
impl ItemStore for FaultyStore {
    async fn create_item(&self, item: &Item) -> Result<()> {
        if self.fail_create_item.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected create failure".to_string()));
        }
        self.inner.create_item(item).await
    }

    async fn get_item(&self, id: &Uuid) -> Result<Option<Item>> {
        self.inner.get_item(id).await
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        self.inner.update_item(item).await
    }

    async fn delete_item(&self, id: &Uuid) -> Result<()> {
        self.deleted_items.lock().push(*id);
        if self.fail_delete_item.load(Ordering::SeqCst) {
            return Err(AppError::Database("injected delete failure".to_string()));
        }
        self.inner.delete_item(id).await
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        self.inner.list_items().await
    }
}

#[async_trait]
impl ReactionStore for FaultyStore {
    async fn get_reaction(&self, item_id: &Uuid, user_id: &Uuid) -> Result<Option<Reaction>> {
        self.inner.get_reaction(item_id, user_id).await
    }

    async fn upsert_reaction(&self, reaction: &Reaction) -> Result<()> {
        self.inner.upsert_reaction(reaction).await
    }

    async fn list_reactions(&self, item_id: &Uuid) -> Result<Vec<Reaction>> {
        self.inner.list_reactions(item_id).await
    }

    async fn get_statistics(&self, item_id: &Uuid) -> Result<Statistics> {
        self.inner.get_statistics(item_id).await
    }
}

/// Services over fault-injecting stores, with indices already created
pub struct Harness {
    pub engine: Arc<FaultyEngine>,
    pub store: Arc<FaultyStore>,
    pub repository: Arc<dyn Repository>,
    pub projection: Arc<ProjectionService>,
    pub items: ItemService,
    pub tags: TagService,
    pub users: UserService,
}

impl Harness {
    pub async fn new() -> Self {
        let engine = Arc::new(FaultyEngine::new());
        let store = Arc::new(FaultyStore::new());
        let repository: Arc<dyn Repository> = store.clone();
        let config = SearchConfigBuilder::new()
            .backend(SearchBackend::InMemory)
            .build();
        let projection = Arc::new(ProjectionService::new(
            engine.clone(),
            config,
            repository.clone(),
        ));
        projection
            .ensure_indices()
            .await
            .expect("indices should be created");

        Self {
            items: ItemService::new(repository.clone(), projection.clone()),
            tags: TagService::new(repository.clone(), projection.clone()),
            users: UserService::new(repository.clone(), projection.clone()),
            engine,
            store,
            repository,
            projection,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.users
            .create(&playbook::models::NewUser {
                username: username.to_string(),
                display_name: String::new(),
            })
            .await
            .expect("user should be created")
    }

    pub async fn tag(&self, owner: &User, name: &str) -> Tag {
        self.tags
            .create(
                &playbook::models::TagRequest {
                    name: name.to_string(),
                    description: String::new(),
                },
                owner.id,
            )
            .await
            .expect("tag should be created")
    }

    pub async fn item(&self, owner: &User, title: &str, tags: Vec<Uuid>, visible: bool) -> Item {
        self.items
            .create(&new_item(title, tags, visible), owner.id)
            .await
            .expect("item should be created")
    }

    pub fn item_document(&self, id: Uuid) -> Option<Value> {
        self.engine.inner.document(ITEMS, &id.to_string())
    }
}

pub fn new_item(title: &str, tags: Vec<Uuid>, visible: bool) -> NewItem {
    NewItem {
        title: title.to_string(),
        content: format!("{} and other smooth words", title),
        tags,
        visible,
    }
}
