//! Dual-write orchestration between the relational store and the search projection
//!
//! The relational store is the source of truth and is written first. Creates carry a
//! compensating [`Saga`]; updates and reaction scripts are not compensated and rely on
//! [`Reindexer`] for recovery.

pub mod items;
pub mod reindex;
pub mod saga;
pub mod tags;
pub mod users;

pub use items::ItemService;
pub use reindex::{ReindexReport, Reindexer};
pub use saga::{record_dual_write, Saga};
pub use tags::TagService;
pub use users::UserService;
