use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        // Users
        .route(
            "/api/users",
            post(handlers::create_user)
                .get(handlers::list_users)
                .delete(handlers::delete_user),
        )
        .route("/api/users/display-name", put(handlers::update_display_name))
        // Tags
        .route(
            "/api/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/api/tags/:id",
            put(handlers::update_tag).delete(handlers::delete_tag),
        )
        // Pickup lines
        .route(
            "/api/pickup-lines",
            get(handlers::list_items).post(handlers::create_item),
        )
        .route("/api/pickup-lines/feed", get(handlers::feed))
        .route(
            "/api/pickup-lines/:id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route(
            "/api/pickup-lines/:id/reaction",
            put(handlers::update_reaction),
        )
        // Maintenance
        .route("/admin/reindex", post(handlers::reindex))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
