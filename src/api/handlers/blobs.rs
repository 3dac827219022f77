use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, AuthUser};
use crate::object_store::{ObjectInfo, ObjectStoreError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Wire shape of a blob-boundary response. `status` says what just
/// happened to the object and is absent on plain reads.
#[derive(Debug, Serialize)]
pub struct BlobObjectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub name: String,
    pub last_updated_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl BlobObjectResponse {
    fn from_info(info: ObjectInfo, status: Option<&str>) -> Self {
        Self {
            status: status.map(|s| s.to_string()),
            name: info.name,
            last_updated_at: info.last_modified,
            description: info.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NameParam {
    pub name: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn blob_create_or_update(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<BlobObjectResponse>, ApiError> {
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
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?,
                );
            }
            "description" => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid description: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let file_name = file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file must carry a filename"))?;
    let description = description.unwrap_or_default();

    // Any storage-side failure on the write path, confirmed or not, is
    // reported as an unprocessable upload.
    let info = state
        .object_store
        .put(&file_name, file_data, &description)
        .await
        .map_err(|e| {
            tracing::error!(name = %file_name, error = %e, "Create or update object failed");
            ApiError::unprocessable("Data is in wrong format")
        })?;

    tracing::info!(name = %file_name, "Object created or updated");
    Ok(Json(BlobObjectResponse::from_info(info, Some("Modified"))))
}

pub async fn blob_get(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    AppQuery(params): AppQuery<NameParam>,
) -> Result<Json<BlobObjectResponse>, ApiError> {
    let info = state
        .object_store
        .stat(&params.name)
        .await
        .map_err(|e| object_error(&params.name, e))?;
    Ok(Json(BlobObjectResponse::from_info(info, None)))
}

pub async fn blob_list(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<Vec<BlobObjectResponse>>, ApiError> {
    let infos = state
        .object_store
        .list()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(
        infos
            .into_iter()
            .map(|info| BlobObjectResponse::from_info(info, None))
            .collect(),
    ))
}

pub async fn blob_delete(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    AppQuery(params): AppQuery<NameParam>,
) -> Result<Json<BlobObjectResponse>, ApiError> {
    let info = state
        .object_store
        .delete(&params.name)
        .await
        .map_err(|e| object_error(&params.name, e))?;

    tracing::info!(name = %params.name, "Object deleted");
    Ok(Json(BlobObjectResponse::from_info(info, Some("Deleted"))))
}

fn object_error(name: &str, e: ObjectStoreError) -> ApiError {
    match e {
        ObjectStoreError::NotFound(_) => {
            ApiError::not_found(format!("Image with name={name} not found"))
        }
        other => ApiError::internal(other.to_string()),
    }
}
