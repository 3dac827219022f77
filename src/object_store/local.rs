use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{ObjectInfo, ObjectStore, ObjectStoreError};

/// Local filesystem object store for development and testing.
///
/// Bytes live at `<base>/<name>`; the description is kept in a JSON sidecar
/// at `<base>/<name>.meta`. Last-modified comes from the filesystem.
pub struct LocalStore {
    base_path: PathBuf,
}

const META_SUFFIX: &str = ".meta";

#[derive(Serialize, Deserialize)]
struct Sidecar {
    description: Option<String>,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{name}{META_SUFFIX}"))
    }

    async fn read_info(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError> {
        let path = self.object_path(name);
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(name.to_string()));
        }

        let meta = tokio::fs::metadata(&path).await?;
        let last_modified: DateTime<Utc> = meta.modified()?.into();

        let description = match tokio::fs::read(self.sidecar_path(name)).await {
            Ok(raw) => serde_json::from_slice::<Sidecar>(&raw)
                .map_err(|e| ObjectStoreError::Unavailable(format!("corrupt sidecar: {e}")))?
                .description,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(ObjectInfo {
            name: name.to_string(),
            last_modified,
            description,
        })
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        name: &str,
        data: Bytes,
        description: &str,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        tokio::fs::write(self.object_path(name), &data).await?;

        let sidecar = Sidecar {
            description: Some(description.to_string()),
        };
        let raw = serde_json::to_vec(&sidecar)
            .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))?;
        tokio::fs::write(self.sidecar_path(name), raw).await?;

        // Confirm the write with a follow-up stat; if the object cannot be
        // read back, the put as a whole fails.
        self.stat(name)
            .await
            .map_err(|e| ObjectStoreError::WriteUnconfirmed(e.to_string()))
    }

    async fn stat(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError> {
        self.read_info(name).await
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(META_SUFFIX) {
                names.push(name);
            }
        }
        names.sort();

        let mut infos = Vec::with_capacity(names.len());
        for name in names {
            infos.push(self.stat(&name).await?);
        }
        Ok(infos)
    }

    async fn delete(&self, name: &str) -> Result<ObjectInfo, ObjectStoreError> {
        // Snapshot first; a miss here is the caller's NotFound.
        let info = self.stat(name).await?;

        tokio::fs::remove_file(self.object_path(name)).await?;
        let sidecar = self.sidecar_path(name);
        if sidecar.exists() {
            tokio::fs::remove_file(sidecar).await?;
        }

        Ok(info)
    }
}
