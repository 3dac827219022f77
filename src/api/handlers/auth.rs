use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::auth::{AuthError, TokenPair};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    match state.tokens.issue(&form.username, &form.password).await {
        Ok(pair) => Ok(Json(pair)),
        Err(AuthError::InvalidCredentials) => {
            Err(ApiError::bad_request("Incorrect username or password"))
        }
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}
