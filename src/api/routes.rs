use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Catalog
        .route("/memes/", get(handlers::list_memes))
        .route(
            "/memes/",
            post(handlers::create_meme).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/memes/:id", get(handlers::get_meme))
        .route("/memes/:id", put(handlers::update_meme))
        .route("/memes/:id", delete(handlers::delete_meme))
        // Blob-service boundary (bearer-authenticated)
        .route(
            "/minio/create_or_update",
            post(handlers::blob_create_or_update).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/minio/get", get(handlers::blob_get))
        .route("/minio/list", get(handlers::blob_list))
        .route("/minio/delete", delete(handlers::blob_delete))
        // Auth
        .route("/auth/token", post(handlers::issue_token))
        // Liveness probe
        .route("/", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
