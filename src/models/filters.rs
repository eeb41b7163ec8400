use crate::search::SortMode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Which items to include with respect to their `visible` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Visibility {
    All,
    Visible,
    NotVisible,
}

/// Already-parsed item search parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemFilters {
    /// Zero-based page number
    pub page: u32,

    /// Autocomplete text matched against titles
    pub title: Option<String>,

    /// Free text matched against content
    pub content: Option<String>,

    /// Tag ids; relevance clauses unless `match_all_tags` is set
    pub tags: Vec<Uuid>,

    /// Require every tag instead of ranking by tag overlap
    pub match_all_tags: bool,

    /// Visibility mode; `None` means "visible unless viewing own items"
    pub visibility: Option<Visibility>,

    /// Only items starred by the requester
    pub starred: bool,

    /// Only items upvoted by the requester
    pub only_upvoted: bool,

    /// Minimum success ratio, ignored when zero
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_success_percentage: f64,

    /// Restrict to items owned by this user
    pub user_id: Option<Uuid>,

    pub sorting: Option<SortMode>,
}

impl ItemFilters {
    /// Whether the filter targets the requester's own items
    pub fn is_viewing_own(&self, requester: Uuid) -> bool {
        self.user_id == Some(requester)
    }
}

/// Already-parsed user search parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFilters {
    pub page: u32,
    pub username: Option<String>,
    pub display_name: Option<String>,
}
