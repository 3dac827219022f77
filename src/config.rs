use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the local storage backend
    pub local_storage_path: String,
    /// S3/MinIO connection details (required when backend is s3)
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the blob-service boundary the catalog synchronizes
    /// against.
    pub root_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Signing secret for bearer tokens
    pub secret_key: String,
    /// HMAC algorithm name (HS256, HS384, HS512)
    pub algorithm: String,
    pub token_expire_minutes: i64,
    /// Account the gateway authenticates with; seeded at startup
    pub username: String,
    pub password: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/meme-catalog.db".to_string());

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./objects".to_string());

        let gateway_url =
            std::env::var("GATEWAY_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let secret_key = std::env::var("AUTH_SECRET_KEY").unwrap_or_default();
        let algorithm = std::env::var("AUTH_ALGORITHM").unwrap_or_else(|_| "HS256".to_string());
        let token_expire_minutes = std::env::var("AUTH_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let auth_username = std::env::var("AUTH_USER").unwrap_or_else(|_| "admin".to_string());
        let auth_password = std::env::var("AUTH_PASSWORD").unwrap_or_default();

        let config = Config {
            server: ServerConfig { bind_address },
            database: DatabaseConfig { url: database_url },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                s3_endpoint: std::env::var("S3_ENDPOINT").ok(),
                s3_access_key: std::env::var("S3_ACCESS_KEY").ok(),
                s3_secret_key: std::env::var("S3_SECRET_KEY").ok(),
                s3_bucket: std::env::var("S3_BUCKET").ok(),
                s3_region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            },
            gateway: GatewayConfig {
                root_url: gateway_url,
            },
            auth: AuthConfig {
                secret_key,
                algorithm,
                token_expire_minutes,
                username: auth_username,
                password: auth_password,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "AUTH_SECRET_KEY must be set".to_string(),
            ));
        }

        if self.auth.password.is_empty() {
            return Err(ConfigError::ValidationError(
                "AUTH_PASSWORD must be set".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::S3) {
            for (var, value) in [
                ("S3_ENDPOINT", &self.storage.s3_endpoint),
                ("S3_ACCESS_KEY", &self.storage.s3_access_key),
                ("S3_SECRET_KEY", &self.storage.s3_secret_key),
                ("S3_BUCKET", &self.storage.s3_bucket),
            ] {
                if value.is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "{var} is required when STORAGE_BACKEND=s3"
                    )));
                }
            }
        }

        if !matches!(self.auth.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            return Err(ConfigError::ValidationError(format!(
                "AUTH_ALGORITHM must be one of HS256, HS384, HS512 (got {})",
                self.auth.algorithm
            )));
        }

        if self.auth.token_expire_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "AUTH_TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
