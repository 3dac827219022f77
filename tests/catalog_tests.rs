mod common;

use bytes::Bytes;
use common::spawn_app;
use meme_catalog::gateway::{BlobGateway, GatewayError};
use meme_catalog::storage::models::MemePatch;
use meme_catalog::storage::{MemeRepository, RepoError};
use meme_catalog::AppState;
use std::sync::Arc;

fn repository(state: &Arc<AppState>) -> MemeRepository {
    MemeRepository::new(state.db.clone(), state.gateway.clone())
}

// ============================================================================
// Upsert / synchronize protocol
// ============================================================================

#[tokio::test]
async fn test_create_then_get_returns_synchronized_record() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let created = repo
        .create("shark.jpg", Bytes::from("jpeg bytes"), "test")
        .await
        .unwrap();
    assert_eq!(created.name, "shark.jpg");
    assert_eq!(created.description, Some("test".to_string()));

    let fetched = repo.get(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name, "shark.jpg");
    assert_eq!(fetched.description, Some("test".to_string()));

    // The catalog's timestamp is the blob store's, not its own clock.
    let blob = state.gateway.get_object("shark.jpg").await.unwrap();
    assert_eq!(fetched.last_updated_at, blob.last_updated_at);
}

#[tokio::test]
async fn test_reupload_keeps_id_and_refreshes_payload() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let first = repo
        .create("cat.png", Bytes::from("v1"), "first upload")
        .await
        .unwrap();
    let second = repo
        .create("cat.png", Bytes::from("v2"), "second upload")
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.description, Some("second upload".to_string()));
    assert!(second.last_updated_at >= first.last_updated_at);

    // Still a single catalog row.
    let all = repo.list(0, 50).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_create_failure_writes_no_partial_row() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;

    // A gateway pointed at a dead port: the blob write fails before any
    // catalog activity.
    let broken = BlobGateway::new("http://127.0.0.1:9", common::TEST_USER, common::TEST_PASSWORD);
    let repo = MemeRepository::new(state.db.clone(), broken);

    let result = repo.create("lost.png", Bytes::from("data"), "never lands").await;
    assert!(matches!(
        result,
        Err(RepoError::Gateway(GatewayError::Transport(_)))
    ));

    let all = repository(&state).list(0, 50).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_list_is_paginated_in_id_order() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    for name in ["a.png", "b.png", "c.png"] {
        repo.create(name, Bytes::from("x"), name).await.unwrap();
    }

    let page1 = repo.list(0, 2).await.unwrap();
    assert_eq!(page1.len(), 2);
    assert!(page1[0].id < page1[1].id);

    let page2 = repo.list(2, 2).await.unwrap();
    assert_eq!(page2.len(), 1);
    assert!(page2[0].id > page1[1].id);
}

#[tokio::test]
async fn test_gateway_listing_matches_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    repo.create("one.png", Bytes::from("1"), "first").await.unwrap();
    repo.create("two.png", Bytes::from("2"), "second").await.unwrap();

    let objects = state.gateway.list_objects().await.unwrap();
    let mut names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["one.png", "two.png"]);
}

#[tokio::test]
async fn test_update_is_catalog_only() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let created = repo
        .create("dog.gif", Bytes::from("gif"), "original")
        .await
        .unwrap();

    let patch = MemePatch {
        description: Some(Some("edited".to_string())),
        ..Default::default()
    };
    let updated = repo.update(created.id, patch).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "dog.gif");
    assert_eq!(updated.description, Some("edited".to_string()));
    assert_eq!(updated.last_updated_at, created.last_updated_at);

    // The blob store never saw the edit.
    let blob = state.gateway.get_object("dog.gif").await.unwrap();
    assert_eq!(blob.description, Some("original".to_string()));
}

#[tokio::test]
async fn test_update_can_clear_description_with_explicit_null() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let created = repo
        .create("blank.png", Bytes::from("x"), "to be cleared")
        .await
        .unwrap();

    // The wire shape distinguishes a missing field from an explicit null.
    let patch: MemePatch = serde_json::from_str(r#"{"description": null}"#).unwrap();
    assert!(!patch.is_empty());

    let updated = repo.update(created.id, patch).await.unwrap();
    assert_eq!(updated.description, None);
    assert_eq!(updated.name, "blank.png");
}

#[tokio::test]
async fn test_delete_removes_blob_and_row() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let created = repo
        .create("temp.jpg", Bytes::from("bytes"), "short lived")
        .await
        .unwrap();

    repo.delete(created.id).await.unwrap();

    assert!(matches!(repo.get(created.id).await, Err(RepoError::NotFound)));
    assert!(matches!(
        state.gateway.get_object("temp.jpg").await,
        Err(GatewayError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_is_best_effort_when_blob_already_gone() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    let created = repo
        .create("vanish.png", Bytes::from("bytes"), "gone early")
        .await
        .unwrap();

    // The blob disappears out from under the catalog.
    state.gateway.delete_object("vanish.png").await.unwrap();

    // The row is still removed.
    repo.delete(created.id).await.unwrap();
    assert!(matches!(repo.get(created.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_missing_id_is_not_found_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = spawn_app(&dir).await;
    let repo = repository(&state);

    assert!(matches!(repo.get(42).await, Err(RepoError::NotFound)));
    assert!(matches!(
        repo.update(42, MemePatch::default()).await,
        Err(RepoError::NotFound)
    ));
    assert!(matches!(repo.delete(42).await, Err(RepoError::NotFound)));
}

// ============================================================================
// End-to-end over HTTP
// ============================================================================

#[tokio::test]
async fn test_end_to_end_upload_list_get_delete() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;
    let client = reqwest::Client::new();

    // Upload shark.jpg with description "test".
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"jpeg bytes".to_vec()).file_name("shark.jpg"),
        )
        .text("description", "test");
    let resp = client
        .post(format!("{base_url}/memes/"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(created["id"], 1);
    assert_eq!(created["name"], "shark.jpg");
    assert_eq!(created["description"], "test");

    // It shows up in the listing.
    let listed: serde_json::Value = client
        .get(format!("{base_url}/memes/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "shark.jpg");

    // Point lookup.
    let fetched: serde_json::Value = client
        .get(format!("{base_url}/memes/1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["description"], "test");

    // Metadata-only edit.
    let resp = client
        .put(format!("{base_url}/memes/1"))
        .json(&serde_json::json!({"description": "renamed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(updated["description"], "renamed");
    assert_eq!(updated["name"], "shark.jpg");

    // Delete, then the id is gone.
    let resp = client
        .delete(format!("{base_url}/memes/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{base_url}/memes/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_http_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, base_url) = spawn_app(&dir).await;
    let client = reqwest::Client::new();

    // Upload without a file part.
    let form = reqwest::multipart::Form::new().text("description", "no file");
    let resp = client
        .post(format!("{base_url}/memes/"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Empty JSON patch.
    let resp = client
        .put(format!("{base_url}/memes/1"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown id on the wire maps to 404.
    let resp = client
        .get(format!("{base_url}/memes/99"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
