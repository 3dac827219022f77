use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token subject no longer exists")]
    UserNotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Bearer credential handed back by `POST /auth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    #[allow(dead_code)]
    id: i64,
    username: String,
    password_hash: String,
}

/// Issues and verifies bearer tokens bound to a username. Credentials live
/// in the `users` table as argon2 hashes; tokens are HMAC-signed JWTs with
/// an expiry claim.
#[derive(Clone)]
pub struct TokenService {
    pool: SqlitePool,
    secret: String,
    algorithm: Algorithm,
    expire_minutes: i64,
}

impl TokenService {
    pub fn new(pool: SqlitePool, secret: String, algorithm: Algorithm, expire_minutes: i64) -> Self {
        Self {
            pool,
            secret,
            algorithm,
            expire_minutes,
        }
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRow>, AuthError> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Check the credentials and mint a fresh token.
    pub async fn issue(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .find_user(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed_hash =
            PasswordHash::new(&user.password_hash).map_err(|_| AuthError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let now = Utc::now();
        let claims = Claims {
            sub: user.username,
            exp: (now + Duration::minutes(self.expire_minutes)).timestamp(),
            iat: now.timestamp(),
        };
        let access_token = encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Decode and validate a bearer token, returning its subject.
    ///
    /// Expiry and signature are rejected by decoding alone; only a valid
    /// token triggers the user-existence lookup.
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(self.algorithm),
        )
        .map_err(|_| AuthError::InvalidToken)?;

        let username = data.claims.sub;
        if self.find_user(&username).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        Ok(username)
    }

    /// Insert the given user with a fresh argon2 hash unless it already
    /// exists. Used at startup for the configured gateway account.
    pub async fn seed_user(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.find_user(username).await?.is_some() {
            return Ok(());
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        tracing::info!(username, "Seeded user");
        Ok(())
    }
}
