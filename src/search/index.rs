//! Search index schema management

use crate::search::config::IndexNames;
use crate::search::document::fields;
use crate::search::engine::SearchEngine;
use crate::search::error::{SearchError, SearchResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use strum::{Display, EnumIter, IntoEnumIterator};

/// The three projection indices, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum IndexKind {
    Items,
    Tags,
    Users,
}

impl IndexKind {
    /// Field mappings of the index
    pub fn mappings(self) -> Value {
        let keyword = || json!({ "type": "keyword" });
        let autocomplete = || json!({ "type": "search_as_you_type", "max_shingle_size": 3 });
        let unsigned_long = || json!({ "type": "unsigned_long" });

        let properties: Vec<(&str, Value)> = match self {
            IndexKind::Items => vec![
                (fields::ID, keyword()),
                (fields::TITLE, autocomplete()),
                (fields::CONTENT, json!({ "type": "text" })),
                (fields::TAGS, keyword()),
                (fields::USER_ID, keyword()),
                (fields::USERNAME, keyword()),
                (fields::DISPLAY_NAME, keyword()),
                (fields::VISIBLE, json!({ "type": "boolean" })),
                (fields::STARRED_BY_USER, keyword()),
                (fields::UPVOTED_BY_USER, keyword()),
                (fields::DOWNVOTED_BY_USER, keyword()),
                (fields::NUMBER_OF_SUCCESSES, unsigned_long()),
                (fields::NUMBER_OF_FAILURES, unsigned_long()),
                (fields::NUMBER_OF_TRIES, unsigned_long()),
                (fields::SUCCESS_PERCENTAGE, json!({ "type": "float" })),
                (fields::UPDATED_AT, json!({ "type": "date" })),
            ],
            IndexKind::Tags => vec![
                (fields::ID, keyword()),
                (fields::NAME, keyword()),
                (fields::USER_ID, keyword()),
            ],
            IndexKind::Users => vec![
                (fields::ID, keyword()),
                (fields::USERNAME, autocomplete()),
                (fields::DISPLAY_NAME, autocomplete()),
            ],
        };

        let properties: Map<String, Value> = properties
            .into_iter()
            .map(|(name, mapping)| (name.to_string(), mapping))
            .collect();
        json!({ "properties": properties })
    }
}

/// Creates the projection indices on an engine
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    names: IndexNames,
}

impl IndexManager {
    pub fn new(engine: Arc<dyn SearchEngine>, names: IndexNames) -> Self {
        Self { engine, names }
    }

    pub fn name(&self, kind: IndexKind) -> &str {
        match kind {
            IndexKind::Items => &self.names.items,
            IndexKind::Tags => &self.names.tags,
            IndexKind::Users => &self.names.users,
        }
    }

    pub async fn index_exists(&self, kind: IndexKind) -> SearchResult<bool> {
        self.engine.index_exists(self.name(kind)).await
    }

    pub async fn create_index(&self, kind: IndexKind) -> SearchResult<()> {
        self.engine
            .create_index(self.name(kind), &kind.mappings())
            .await
    }

    /// Create each missing index. Any failure is fatal to the caller.
    pub async fn ensure_indices(&self) -> SearchResult<()> {
        for kind in IndexKind::iter() {
            let name = self.name(kind);
            let exists = self.index_exists(kind).await.map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to check index {}: {}", name, e))
            })?;

            if exists {
                tracing::debug!(index = %name, kind = %kind, "Index already exists");
                continue;
            }

            self.create_index(kind).await.map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create index {}: {}", name, e))
            })?;
            tracing::info!(index = %name, kind = %kind, "Created search index");
        }

        Ok(())
    }
}
