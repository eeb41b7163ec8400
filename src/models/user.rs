use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered user as stored relationally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    /// Unique identifier (UUIDv7)
    pub id: Uuid,

    /// Login name, an e-mail address
    #[validate(email)]
    pub username: String,

    /// Name shown next to the user's content
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
}

impl User {
    /// Create a new user; an empty display name falls back to the username
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        let username = username.into();
        let mut display_name = display_name.into();
        if display_name.trim().is_empty() {
            display_name = username.clone();
        }

        Self {
            id: Uuid::now_v7(),
            username,
            display_name,
        }
    }

    /// Public summary used in item views and user search results
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Body of a sign-up request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub username: String,

    /// Defaults to the username when empty
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DisplayNameRequest {
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
}

/// Owner information denormalized onto items and returned by user search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        user.summary()
    }
}
