use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meme_catalog::{
    api,
    auth::TokenService,
    config::{Config, StorageBackend},
    gateway::BlobGateway,
    object_store as obj, storage, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "meme-catalog starting");

    // Load configuration
    let config = Config::load()?;

    // Open the catalog database and run migrations
    let db = storage::db::connect(&config.database.url).await?;
    info!("Database ready at: {}", config.database.url);

    // Initialize object store backend
    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_storage_path)?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::S3 => {
            let store = obj::S3Store::new(
                config
                    .storage
                    .s3_endpoint
                    .as_deref()
                    .expect("S3_ENDPOINT validated in config"),
                config
                    .storage
                    .s3_bucket
                    .as_deref()
                    .expect("S3_BUCKET validated in config"),
                &config.storage.s3_region,
                config
                    .storage
                    .s3_access_key
                    .as_deref()
                    .expect("S3_ACCESS_KEY validated in config"),
                config
                    .storage
                    .s3_secret_key
                    .as_deref()
                    .expect("S3_SECRET_KEY validated in config"),
            )?;
            info!(
                "Using S3 storage backend, bucket: {}",
                config.storage.s3_bucket.as_deref().unwrap_or_default()
            );
            Arc::new(store)
        }
    };

    // Token service, plus the account the gateway logs in with
    let algorithm: jsonwebtoken::Algorithm = config.auth.algorithm.parse()?;
    let tokens = TokenService::new(
        db.clone(),
        config.auth.secret_key.clone(),
        algorithm,
        config.auth.token_expire_minutes,
    );
    tokens
        .seed_user(&config.auth.username, &config.auth.password)
        .await?;

    let gateway = BlobGateway::new(
        &config.gateway.root_url,
        &config.auth.username,
        &config.auth.password,
    );

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        object_store,
        gateway,
        tokens,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
