pub mod handlers;
pub mod requester;
pub mod routes;

pub use requester::{Requester, REQUESTER_HEADER};
pub use routes::*;

use crate::search::ProjectionService;
use crate::services::{ItemService, Reindexer, TagService, UserService};
use crate::state::Repository;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub items: ItemService,
    pub tags: TagService,
    pub users: UserService,
    pub reindexer: Reindexer,
}

impl AppState {
    pub fn new(repository: Arc<dyn Repository>, projection: Arc<ProjectionService>) -> Self {
        Self {
            items: ItemService::new(repository.clone(), projection.clone()),
            tags: TagService::new(repository.clone(), projection.clone()),
            users: UserService::new(repository.clone(), projection.clone()),
            reindexer: Reindexer::new(repository, projection),
        }
    }
}
