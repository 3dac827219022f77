mod common;

use common::{spawn_app, TEST_PASSWORD, TEST_SECRET, TEST_USER};
use meme_catalog::auth::{AuthError, TokenService};
use meme_catalog::storage;

async fn test_service(temp_dir: &tempfile::TempDir, expire_minutes: i64) -> TokenService {
    let db_url = format!("sqlite://{}", temp_dir.path().join("tokens.db").display());
    let db = storage::db::connect(&db_url).await.unwrap();
    let service = TokenService::new(
        db,
        TEST_SECRET.to_string(),
        jsonwebtoken::Algorithm::HS256,
        expire_minutes,
    );
    service.seed_user(TEST_USER, TEST_PASSWORD).await.unwrap();
    service
}

#[tokio::test]
async fn test_issue_and_verify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(&dir, 30).await;

    let pair = service.issue(TEST_USER, TEST_PASSWORD).await.unwrap();
    assert_eq!(pair.token_type, "bearer");
    assert!(!pair.access_token.is_empty());

    let subject = service.verify(&pair.access_token).await.unwrap();
    assert_eq!(subject, TEST_USER);
}

#[tokio::test]
async fn test_issue_wrong_password() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(&dir, 30).await;

    let result = service.issue(TEST_USER, "wrong").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_issue_unknown_user() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(&dir, 30).await;

    let result = service.issue("nobody", TEST_PASSWORD).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_verify_garbage_token() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(&dir, 30).await;

    let result = service.verify("not-a-jwt").await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_verify_expired_token() {
    let dir = tempfile::tempdir().unwrap();
    // Mint tokens that expired well past the default validation leeway.
    let service = test_service(&dir, -5).await;

    let pair = service.issue(TEST_USER, TEST_PASSWORD).await.unwrap();
    let result = service.verify(&pair.access_token).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_verify_token_for_deleted_user() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("tokens.db").display());
    let db = storage::db::connect(&db_url).await.unwrap();
    let service = TokenService::new(
        db.clone(),
        TEST_SECRET.to_string(),
        jsonwebtoken::Algorithm::HS256,
        30,
    );
    service.seed_user(TEST_USER, TEST_PASSWORD).await.unwrap();

    let pair = service.issue(TEST_USER, TEST_PASSWORD).await.unwrap();

    sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(TEST_USER)
        .execute(&db)
        .await
        .unwrap();

    let result = service.verify(&pair.access_token).await;
    assert!(matches!(result, Err(AuthError::UserNotFound)));
}

#[tokio::test]
async fn test_seed_user_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let service = test_service(&dir, 30).await;

    // A second seed must not duplicate the row or rotate the hash.
    service.seed_user(TEST_USER, TEST_PASSWORD).await.unwrap();
    service.issue(TEST_USER, TEST_PASSWORD).await.unwrap();
}

// ============================================================================
// HTTP surface
// ============================================================================

#[tokio::test]
async fn test_token_endpoint_issues_bearer() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/auth/token"))
        .form(&[("username", TEST_USER), ("password", TEST_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_token_endpoint_rejects_bad_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/auth/token"))
        .form(&[("username", TEST_USER), ("password", "nope")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_blob_boundary_requires_token() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;

    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base_url}/minio/list"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base_url}/minio/list"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_blob_boundary_accepts_issued_token() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;

    let client = reqwest::Client::new();
    let token: serde_json::Value = client
        .post(format!("{base_url}/auth/token"))
        .form(&[("username", TEST_USER), ("password", TEST_PASSWORD)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .get(format!("{base_url}/minio/list"))
        .bearer_auth(token["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
