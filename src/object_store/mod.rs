mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// No object exists under the requested key.
    #[error("Object not found: {0}")]
    NotFound(String),
    /// The backend rejected or failed the operation outright.
    #[error("Backend error: {0}")]
    Unavailable(String),
    /// The write went out but the confirming stat failed, so the outcome
    /// cannot be reported. Treated as a full failure.
    #[error("Write could not be confirmed: {0}")]
    WriteUnconfirmed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the store knows about one object, minus the bytes.
/// `last_modified` is maintained by the backend and is the authoritative
/// timestamp the catalog synchronizes against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub description: Option<String>,
}

/// Abstraction over object storage backends. Keys are the public object
/// names; the description rides along as backend metadata and is only
/// readable via `stat`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write or overwrite an object, then stat it to pick up the backend's
    /// last-modified. A failed follow-up stat fails the whole put.
    async fn put(
        &self,
        name: &str,
        data: Bytes,
        description: &str,
    ) -> Result<ObjectInfo, ObjectStoreError>;

    async fn stat(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError>;

    /// Enumerate every object. Keys are listed first, then each one is
    /// stat-ed individually (N+1 round trips; fine while catalogs stay
    /// small).
    async fn list(&self) -> Result<Vec<ObjectInfo>, ObjectStoreError>;

    /// Stat-then-remove. The returned info is the pre-deletion snapshot.
    async fn delete(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError>;
}
