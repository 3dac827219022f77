use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One catalog row. `id` is assigned by SQLite on first insert and never
/// changes; `name` is the blob-store object key; `last_updated_at` mirrors
/// the blob store's last-modified as of the most recent synchronize.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemeRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub last_updated_at: DateTime<Utc>,
}

/// Partial update for a catalog row. Omitted fields keep their prior
/// values; `description` distinguishes "not sent" from an explicit null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl MemePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.last_updated_at.is_none()
    }
}

/// Distinguishes between a missing field (`None`) and an explicit `null`
/// (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}
