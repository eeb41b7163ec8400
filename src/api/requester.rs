use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the id of the calling user
pub const REQUESTER_HEADER: &str = "x-user-id";

/// Identity of the calling user, resolved by an upstream authenticator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester(pub Uuid);

impl Requester {
    pub fn id(self) -> Uuid {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(REQUESTER_HEADER)
            .ok_or_else(|| AppError::Authentication("Missing required header: X-User-Id".to_string()))?
            .to_str()
            .map_err(|_| AppError::Authentication("Invalid X-User-Id header: not valid UTF-8".to_string()))?;

        let id = Uuid::parse_str(raw.trim())
            .map_err(|_| AppError::Authentication("X-User-Id must be a valid UUID".to_string()))?;

        Ok(Requester(id))
    }
}
