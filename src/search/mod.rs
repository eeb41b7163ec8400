//! Search projection of the relational store
//!
//! Items, tags and users are mirrored into three search indices. The relational store stays
//! the source of truth; the projection is written after it and read for ranked search.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           ProjectionService                      │
//! ├─────────────────────────────────────────────────┤
//! │  - index_item()      - update_item()            │
//! │  - apply_reaction()  - search_items()           │
//! │  - purge_user_items() - search_users()          │
//! └─────────────────────────────────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │ BoolQueryBuilder     │  │ ReactionScript       │
//! │ + SortMode ranking   │  │ (atomic counters)    │
//! └──────────────────────┘  └──────────────────────┘
//!          │                          │
//!          ▼                          ▼
//! ┌─────────────────────────────────────────────────┐
//! │           SearchEngine                           │
//! ├─────────────────────────────────────────────────┤
//! │  ElasticsearchEngine  |  InMemorySearchEngine    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Reaction counters on item documents are never replaced by document writes. They only
//! change through [`ReactionScript`], which the engine applies atomically server side.

mod config;
mod document;
mod elasticsearch;
mod engine;
mod error;
mod hydrate;
mod index;
mod memory;
mod query;
mod ranking;
mod script;
mod service;

pub use config::{IndexNames, SearchBackend, SearchConfig, SearchConfigBuilder};
pub use document::{fields, ItemDocument, ItemUpdateDocument, TagDocument, UserDocument};
pub use elasticsearch::ElasticsearchEngine;
pub use engine::{create_engine, RawHit, RawSearchResponse, SearchEngine};
pub use error::{SearchError, SearchResult};
pub use hydrate::{Hydrator, TagResolver};
pub use index::{IndexKind, IndexManager};
pub use memory::InMemorySearchEngine;
pub use query::{
    apply_item_filters, apply_user_filters, BoolQueryBuilder, Query, QueryBuilder, ScoreFunction,
    SearchRequest,
};
pub use ranking::{apply_sorting, SortMode, BEST_OF_ALL_TIME_UPVOTE_WEIGHT, NEW_SCALE_DAYS};
pub use script::{ReactionScript, ScriptStep};
pub use service::ProjectionService;
