//! Shared helpers for meme-catalog integration tests.
//!
//! `spawn_app` runs the full router (catalog + blob boundary + auth) on an
//! ephemeral port with a temp-dir SQLite catalog and local object store,
//! and points the gateway back at that same server -- the same shape as a
//! deployed catalog talking to a remote blob service, minus the network.

use std::sync::Arc;

use meme_catalog::{
    api,
    auth::TokenService,
    config::{
        AuthConfig, Config, DatabaseConfig, GatewayConfig, ServerConfig, StorageBackend,
        StorageConfig,
    },
    gateway::BlobGateway,
    object_store::LocalStore,
    storage, AppState,
};

pub const TEST_USER: &str = "tester";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_SECRET: &str = "test-signing-secret";

pub fn test_config(temp_dir: &tempfile::TempDir, gateway_url: &str) -> Config {
    let db_path = temp_dir.path().join("catalog.db");
    let files_dir = temp_dir.path().join("objects");

    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_storage_path: files_dir.to_string_lossy().to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_bucket: None,
            s3_region: "us-east-1".to_string(),
        },
        gateway: GatewayConfig {
            root_url: gateway_url.to_string(),
        },
        auth: AuthConfig {
            secret_key: TEST_SECRET.to_string(),
            algorithm: "HS256".to_string(),
            token_expire_minutes: 30,
            username: TEST_USER.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
        max_upload_size: 10 * 1024 * 1024,
    }
}

/// Spin up the whole application on 127.0.0.1:0. Returns the shared state
/// (with a gateway wired to the live server) and the server's base URL.
pub async fn spawn_app(temp_dir: &tempfile::TempDir) -> (Arc<AppState>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let config = test_config(temp_dir, &base_url);

    let db = storage::db::connect(&config.database.url)
        .await
        .expect("Failed to open test database");

    let tokens = TokenService::new(
        db.clone(),
        config.auth.secret_key.clone(),
        jsonwebtoken::Algorithm::HS256,
        config.auth.token_expire_minutes,
    );
    tokens
        .seed_user(TEST_USER, TEST_PASSWORD)
        .await
        .expect("Failed to seed test user");

    let object_store =
        LocalStore::new(&config.storage.local_storage_path).expect("Failed to create object store");

    let gateway = BlobGateway::new(&base_url, TEST_USER, TEST_PASSWORD);

    let state = Arc::new(AppState {
        config,
        db,
        object_store: Arc::new(object_store),
        gateway,
        tokens,
    });

    let app = api::create_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server died");
    });

    (state, base_url)
}
