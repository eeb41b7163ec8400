use crate::api::{AppState, Requester};
use crate::error::{AppError, Result};
use crate::models::*;
use crate::search::SortMode;
use crate::services::ReindexReport;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;
use uuid::Uuid;

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Mark process start for the health endpoint
pub fn mark_started() {
    STARTED_AT.get_or_init(Instant::now);
}

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: STARTED_AT.get().map_or(0, |start| start.elapsed().as_secs()),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> (StatusCode, String) {
    let metrics = crate::metrics::gather_metrics();
    (StatusCode::OK, metrics)
}

/// Raw item list parameters as they appear in the query string
#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub page: Option<u32>,
    pub title: Option<String>,
    pub content: Option<String>,
    /// Comma separated tag ids
    pub tags: Option<String>,
    pub match_all_tags: Option<bool>,
    pub visibility: Option<String>,
    pub starred: Option<bool>,
    pub only_upvoted: Option<bool>,
    pub success_percentage: Option<f64>,
    pub user_id: Option<String>,
    pub sorting_type: Option<String>,
}

impl TryFrom<ItemListQuery> for ItemFilters {
    type Error = AppError;

    fn try_from(query: ItemListQuery) -> Result<Self> {
        let tags = query
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::Validation(format!("Invalid tag id: {}", raw)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ItemFilters {
            page: query.page.unwrap_or(0),
            title: query.title,
            content: query.content,
            tags,
            match_all_tags: query.match_all_tags.unwrap_or(false),
            visibility: parse_enum::<Visibility>("visibility", query.visibility)?,
            starred: query.starred.unwrap_or(false),
            only_upvoted: query.only_upvoted.unwrap_or(false),
            min_success_percentage: query.success_percentage.unwrap_or(0.0),
            user_id: parse_enum::<Uuid>("user_id", query.user_id)?,
            sorting: parse_enum::<SortMode>("sorting_type", query.sorting_type)?,
        })
    }
}

/// Query strings that fail to deserialize are validation errors
fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Empty values count as unset
fn parse_enum<T: FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => T::from_str(value)
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid {}: {}", name, value))),
    }
}

/// Search items
pub async fn list_items(
    State(state): State<AppState>,
    requester: Requester,
    query: std::result::Result<Query<ItemListQuery>, QueryRejection>,
) -> Result<Json<ItemPage>> {
    let filters = ItemFilters::try_from(query_params(query)?)?;
    Ok(Json(state.items.search(&filters, requester.id()).await?))
}

/// Visible items only
pub async fn feed(
    State(state): State<AppState>,
    requester: Requester,
    query: std::result::Result<Query<ItemListQuery>, QueryRejection>,
) -> Result<Json<ItemPage>> {
    let filters = ItemFilters::try_from(query_params(query)?)?;
    Ok(Json(state.items.feed(&filters, requester.id()).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>)> {
    let item = state.items.create(&request, requester.id()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemView>> {
    Ok(Json(state.items.get(id, requester.id()).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
    Json(request): Json<NewItem>,
) -> Result<Json<Item>> {
    Ok(Json(state.items.update(id, &request, requester.id()).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.items.delete(id, requester.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_reaction(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
    Json(request): Json<ReactionRequest>,
) -> Result<Json<Reaction>> {
    Ok(Json(
        state
            .items
            .update_reaction(id, requester.id(), request)
            .await?,
    ))
}

/// Sign up; the new user becomes the requester of later calls
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.users.create(&request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _requester: Requester,
    query: std::result::Result<Query<UserListQuery>, QueryRejection>,
) -> Result<Json<UserPage>> {
    let query = query_params(query)?;
    let filters = UserFilters {
        page: query.page.unwrap_or(0),
        username: query.username,
        display_name: query.display_name,
    };
    Ok(Json(state.users.search(&filters).await?))
}

pub async fn update_display_name(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<DisplayNameRequest>,
) -> Result<Json<User>> {
    Ok(Json(
        state
            .users
            .update_display_name(requester.id(), &request)
            .await?,
    ))
}

/// Delete the requester with everything they own
pub async fn delete_user(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<StatusCode> {
    state.users.delete(requester.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(
    State(state): State<AppState>,
    requester: Requester,
) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.tags.list_for_user(requester.id()).await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    requester: Requester,
    Json(request): Json<TagRequest>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = state.tags.create(&request, requester.id()).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
    Json(request): Json<TagRequest>,
) -> Result<Json<Tag>> {
    Ok(Json(state.tags.update(id, &request, requester.id()).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    requester: Requester,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.tags.delete(id, requester.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuild every projection document from the relational store
pub async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexReport>> {
    tracing::info!("Full reindex requested");
    Ok(Json(state.reindexer.rebuild().await?))
}
