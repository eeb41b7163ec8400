pub mod filters;
pub mod item;
pub mod reaction;
pub mod statistics;
pub mod tag;
pub mod user;
pub mod views;

pub use filters::*;
pub use item::*;
pub use reaction::*;
pub use statistics::*;
pub use tag::*;
pub use user::*;
pub use views::*;
