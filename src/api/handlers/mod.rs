mod auth;
mod blobs;
mod memes;

use axum::Json;
use serde::Serialize;

use crate::api::response::ApiError;
use crate::storage::RepoError;

pub use auth::issue_token;
pub use blobs::{blob_create_or_update, blob_delete, blob_get, blob_list};
pub use memes::{create_meme, delete_meme, get_meme, list_memes, update_meme};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// Map repository failures that are not entity lookups to HTTP errors.
/// `NotFound` is handled at each call site so the message can carry the id.
fn repo_error(e: RepoError) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::not_found("Meme not found"),
        RepoError::Unprocessable => ApiError::unprocessable("Data is in wrong format"),
        RepoError::Gateway(e) => ApiError::internal(e.to_string()),
        RepoError::Database(e) => ApiError::internal(e.to_string()),
    }
}
