use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::repo_error;
use crate::api::response::{ApiError, AppQuery};
use crate::storage::models::{MemePatch, MemeRecord};
use crate::storage::{MemeRepository, RepoError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListMemesParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

const MAX_LIMIT: i64 = 100;

// ============================================================================
// Handlers
// ============================================================================

fn repository(state: &Arc<AppState>) -> MemeRepository {
    MemeRepository::new(state.db.clone(), state.gateway.clone())
}

pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MemeRecord>), ApiError> {
    let mut file_name: Option<String> = None;
    let mut file_data: Option<bytes::Bytes> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }
                file_data = Some(data);
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid description: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let file_name = file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file must carry a filename"))?;
    let description =
        description.ok_or_else(|| ApiError::bad_request("description field is required"))?;

    let record = repository(&state)
        .create(&file_name, file_data, &description)
        .await
        .map_err(repo_error)?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListMemesParams>,
) -> Result<Json<Vec<MemeRecord>>, ApiError> {
    if params.limit <= 0 || params.offset < 0 {
        return Err(ApiError::bad_request(
            "limit must be positive and offset non-negative",
        ));
    }

    let records = repository(&state)
        .list(params.offset, params.limit.min(MAX_LIMIT))
        .await
        .map_err(repo_error)?;
    Ok(Json(records))
}

pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MemeRecord>, ApiError> {
    let record = repository(&state).get(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::not_found(format!("Meme with ID={id} not found")),
        other => repo_error(other),
    })?;
    Ok(Json(record))
}

pub async fn update_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<MemePatch>,
) -> Result<Json<MemeRecord>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::bad_request(
            "at least one field (name, description, last_updated_at) must be provided",
        ));
    }

    let record = repository(&state)
        .update(id, patch)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => ApiError::not_found(format!("Meme with ID={id} not found")),
            other => repo_error(other),
        })?;
    Ok(Json(record))
}

pub async fn delete_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<()>, ApiError> {
    repository(&state).delete(id).await.map_err(|e| match e {
        RepoError::NotFound => ApiError::not_found(format!("Meme with ID={id} not found")),
        other => repo_error(other),
    })?;
    Ok(Json(()))
}
