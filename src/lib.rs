//! meme-catalog - A catalog API for named binary objects ("memes")
//!
//! This crate provides upload, listing, and metadata management with:
//! - Swappable object storage backends (local filesystem, S3/MinIO)
//! - A relational metadata catalog (SQLite via sqlx) kept convergent with
//!   the blob store through an upsert-on-synchronize protocol
//! - A bearer-token-guarded HTTP boundary in front of all blob access
//! - REST API with multipart upload support

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod object_store;
pub mod storage;

use std::sync::Arc;

use auth::TokenService;
use config::Config;
use gateway::BlobGateway;
use sqlx::SqlitePool;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub gateway: BlobGateway,
    pub tokens: TokenService,
}
