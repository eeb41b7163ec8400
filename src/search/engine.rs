//! The search engine capability the projection is written to

use crate::search::config::{SearchBackend, SearchConfig};
use crate::search::elasticsearch::ElasticsearchEngine;
use crate::search::error::SearchResult;
use crate::search::memory::InMemorySearchEngine;
use crate::search::query::{Query, SearchRequest};
use crate::search::script::ReactionScript;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A single hit as returned by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub score: f64,
    pub source: Value,
}

/// Engine response before hydration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResponse {
    /// Total matches, ignoring pagination
    pub total: u64,
    pub hits: Vec<RawHit>,
}

/// Document store with ranked search and atomic scripted updates
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index_exists(&self, index: &str) -> SearchResult<bool>;

    /// Create an index with the given field mappings
    async fn create_index(&self, index: &str, mappings: &Value) -> SearchResult<()>;

    /// Insert or replace a whole document
    async fn index_document(&self, index: &str, id: &str, document: &Value) -> SearchResult<()>;

    /// Merge the given fields into an existing document
    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> SearchResult<()>;

    /// Run a reaction script against an existing document as one atomic operation
    async fn update_by_script(
        &self,
        index: &str,
        id: &str,
        script: &ReactionScript,
    ) -> SearchResult<()>;

    async fn delete_document(&self, index: &str, id: &str) -> SearchResult<()>;

    /// Delete every matching document, returning how many were removed
    async fn delete_by_query(&self, index: &str, query: &Query) -> SearchResult<u64>;

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<RawSearchResponse>;
}

/// Create the search engine selected by configuration
pub fn create_engine(config: &SearchConfig) -> SearchResult<Arc<dyn SearchEngine>> {
    match config.backend {
        SearchBackend::Elasticsearch => {
            tracing::info!(node = %config.node_url, "Initializing Elasticsearch search backend");
            Ok(Arc::new(ElasticsearchEngine::new(config)?))
        }
        SearchBackend::InMemory => {
            tracing::info!("Initializing in-memory search backend");
            Ok(Arc::new(InMemorySearchEngine::new()))
        }
    }
}
