use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::TokenPair;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Token issuance failed or the blob service rejected our bearer token.
    /// Distinct from `NotFound`: an auth failure says nothing about the
    /// object.
    #[error("Authentication against the blob service failed")]
    AuthenticationFailed,
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Blob service could not process the write")]
    Unprocessable,
    #[error("Blob service unreachable: {0}")]
    Transport(String),
}

/// Blob-store view of one object, as reported across the HTTP boundary.
/// The wire response also carries a `status` field which is dropped here.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSummary {
    pub name: String,
    pub last_updated_at: DateTime<Utc>,
    pub description: Option<String>,
}

/// Client for the blob-service boundary. Every logical call authenticates
/// first and sends a fresh bearer token; nothing is cached, so a revoked
/// user or rotated secret takes effect on the next call.
#[derive(Clone)]
pub struct BlobGateway {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl BlobGateway {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    async fn login(&self) -> Result<String, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/auth/token", self.base_url))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::AuthenticationFailed);
        }

        let token: TokenPair = resp
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(token.access_token)
    }

    /// Translate a blob-service status into the gateway error taxonomy.
    fn check(resp: reqwest::Response, name: &str) -> Result<reqwest::Response, GatewayError> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(GatewayError::AuthenticationFailed)
            }
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(name.to_string())),
            StatusCode::UNPROCESSABLE_ENTITY => Err(GatewayError::Unprocessable),
            s => Err(GatewayError::Transport(format!("unexpected status {s}"))),
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        resp.json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    /// Upload (or overwrite) an object and return the synchronized view the
    /// blob service reports back.
    pub async fn create_or_update(
        &self,
        name: &str,
        data: Bytes,
        description: &str,
    ) -> Result<ObjectSummary, GatewayError> {
        let token = self.login().await?;

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(data.to_vec()).file_name(name.to_string()),
            )
            .text("description", description.to_string());

        let resp = self
            .client
            .post(format!("{}/minio/create_or_update", self.base_url))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::parse(Self::check(resp, name)?).await
    }

    pub async fn get_object(&self, name: &str) -> Result<ObjectSummary, GatewayError> {
        let token = self.login().await?;

        let resp = self
            .client
            .get(format!("{}/minio/get", self.base_url))
            .query(&[("name", name)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::parse(Self::check(resp, name)?).await
    }

    pub async fn list_objects(&self) -> Result<Vec<ObjectSummary>, GatewayError> {
        let token = self.login().await?;

        let resp = self
            .client
            .get(format!("{}/minio/list", self.base_url))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::parse(Self::check(resp, "")?).await
    }

    pub async fn delete_object(&self, name: &str) -> Result<ObjectSummary, GatewayError> {
        let token = self.login().await?;

        let resp = self
            .client
            .delete(format!("{}/minio/delete", self.base_url))
            .query(&[("name", name)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::parse(Self::check(resp, name)?).await
    }
}
