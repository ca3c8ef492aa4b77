//! API tests running the real router against mock dependencies.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use mediaflow_core::{testing::MockTransport, BatchConfig, TransportError};
use serde_json::json;

use common::TestFixture;

fn server_error() -> TransportError {
    TransportError::Server {
        status: 503,
        message: "unavailable".to_string(),
    }
}

// =============================================================================
// Health and config
// =============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_hides_token() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "bearer");
    assert_eq!(response.body["auth"]["token_configured"], true);
    assert_eq!(response.body["remote"]["collection_id"], "test-collection");
    assert!(!response.body.to_string().contains("super-secret"));
}

// =============================================================================
// Enqueue and listing
// =============================================================================

#[tokio::test]
async fn test_enqueue_reports_each_path() {
    let fixture = TestFixture::new();
    let good = fixture.write_file("beach.png", 64);
    let unsupported = fixture.write_file("notes.txt", 64);
    let missing = fixture.temp_dir.path().join("missing.png");

    let response = fixture
        .post(
            "/api/v1/items",
            json!({ "paths": [good, unsupported, missing] }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["accepted"], 1);
    let results = response.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["outcome"], "accepted");
    assert!(results[0]["item_id"].is_string());
    assert_eq!(results[1]["outcome"], "rejected");
    assert_eq!(results[1]["reason"]["reason"], "unsupported_type");
    assert_eq!(results[2]["outcome"], "unreadable");

    let list = fixture.get("/api/v1/items").await;
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["items"][0]["name"], "beach.png");
    assert_eq!(list.body["items"][0]["status"], "pending");
    assert!(list.body["items"][0]["preview_url"].is_string());
}

#[tokio::test]
async fn test_enqueue_applies_tags_and_description() {
    let fixture = TestFixture::new();
    let path = fixture.write_file("party.jpg", 32);

    let response = fixture
        .post(
            "/api/v1/items",
            json!({
                "paths": [path],
                "tags": ["2024", " summer "],
                "description": "rooftop"
            }),
        )
        .await;
    let id = response.body["results"][0]["item_id"].as_str().unwrap();

    let item = fixture.get(&format!("/api/v1/items/{}", id)).await;
    assert_eq!(item.status, StatusCode::OK);
    assert_eq!(item.body["mime_type"], "image/jpeg");
    assert_eq!(item.body["description"], "rooftop");
    assert_eq!(item.body["tags"], json!(["2024", "summer"]));
}

#[tokio::test]
async fn test_enqueue_during_session_uploads_with_metadata() {
    let fixture =
        TestFixture::with_transport(MockTransport::new().with_delay(Duration::from_millis(100)));
    fixture.enqueue_files(&["first.png"], 32).await;
    let response = fixture.post_empty("/api/v1/session/start").await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let late = fixture.write_file("late.png", 32);
    let response = fixture
        .post(
            "/api/v1/items",
            json!({
                "paths": [late],
                "tags": ["summer"],
                "description": "rooftop"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["accepted"], 1);

    let summary = fixture.orchestrator.wait_for_session().await.unwrap();
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.completed_items, 2);

    let calls = fixture.transport.calls().await;
    let sent = calls
        .iter()
        .find(|c| c.request.name == "late.png")
        .expect("late item should be uploaded");
    assert!(sent.request.tags.contains("summer"));
    assert_eq!(sent.request.description, "rooftop");
}

#[tokio::test]
async fn test_enqueue_oversized_file_is_rejected() {
    let fixture = TestFixture::with_batch(BatchConfig {
        max_item_size_bytes: 100,
        ..BatchConfig::default()
    });
    let path = fixture.write_file("big.png", 101);

    let response = fixture
        .post("/api/v1/items", json!({ "paths": [path] }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["accepted"], 0);
    assert_eq!(response.body["results"][0]["reason"]["reason"], "too_large");
    assert_eq!(response.body["results"][0]["reason"]["max_bytes"], 100);
}

#[tokio::test]
async fn test_enqueue_requires_paths() {
    let fixture = TestFixture::new();

    let response = fixture.post("/api/v1/items", json!({ "paths": [] })).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_item_is_not_found() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/items/does-not-exist").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"].as_str().unwrap().contains("does-not-exist"));
}

// =============================================================================
// Session lifecycle
// =============================================================================

#[tokio::test]
async fn test_start_session_uploads_everything() {
    let fixture = TestFixture::new();
    fixture
        .enqueue_files(&["a.png", "b.png", "c.png", "d.png"], 128)
        .await;

    let response = fixture.post_empty("/api/v1/session/start").await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let summary = fixture.orchestrator.wait_for_session().await.unwrap();
    assert_eq!(summary.completed_items, 4);

    let session = fixture.get("/api/v1/session").await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["running"], false);
    assert_eq!(session.body["progress"]["overall_percent"], 100);
    assert_eq!(session.body["progress"]["completed_items"], 4);
    assert_eq!(session.body["session"]["transferred_bytes"], 4 * 128);

    let items = fixture.get("/api/v1/items").await;
    for item in items.body["items"].as_array().unwrap() {
        assert_eq!(item["status"], "completed");
        assert!(item["remote_id"].is_string());
    }
}

#[tokio::test]
async fn test_start_without_pending_items_conflicts() {
    let fixture = TestFixture::new();

    let response = fixture.post_empty("/api/v1/session/start").await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_session_before_any_start() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/v1/session").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["session"].is_null());
    assert_eq!(response.body["progress"]["active"], false);
}

#[tokio::test]
async fn test_cancel_without_session() {
    let fixture = TestFixture::new();

    let response = fixture.post_empty("/api/v1/session/cancel").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["cancelled"], false);
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn test_retry_failed_item() {
    let fixture = TestFixture::new();
    fixture.transport.fail_name("b.png", server_error()).await;
    let ids = fixture.enqueue_files(&["a.png", "b.png"], 16).await;

    fixture.post_empty("/api/v1/session/start").await;
    fixture.orchestrator.wait_for_session().await.unwrap();

    let failed = fixture.get(&format!("/api/v1/items/{}", ids[1])).await;
    assert_eq!(failed.body["status"], "failed");
    assert_eq!(failed.body["error_message"], "server error 503: unavailable");

    let response = fixture
        .post_empty(&format!("/api/v1/items/{}/retry", ids[1]))
        .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);

    let summary = fixture.orchestrator.wait_for_session().await.unwrap();
    assert_eq!(summary.total_items, 1);
    assert_eq!(summary.completed_items, 1);

    let item = fixture.get(&format!("/api/v1/items/{}", ids[1])).await;
    assert_eq!(item.body["status"], "completed");
    assert!(item.body["error_message"].is_null());
}

#[tokio::test]
async fn test_retry_completed_item_conflicts() {
    let fixture = TestFixture::new();
    let ids = fixture.enqueue_files(&["a.png"], 16).await;
    fixture.orchestrator.run().await.unwrap();

    let response = fixture
        .post_empty(&format!("/api/v1/items/{}/retry", ids[0]))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("expected failed"));
}

#[tokio::test]
async fn test_retry_all() {
    let fixture = TestFixture::new();
    fixture.transport.fail_name("a.png", server_error()).await;
    fixture.transport.fail_name("c.png", server_error()).await;
    fixture.enqueue_files(&["a.png", "b.png", "c.png"], 16).await;
    fixture.orchestrator.run().await.unwrap();

    let response = fixture.post_empty("/api/v1/items/retry-all").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
    fixture.orchestrator.wait_for_session().await.unwrap();

    let again = fixture.post_empty("/api/v1/items/retry-all").await;
    assert_eq!(again.body["count"], 0);
}

// =============================================================================
// Editing and removal
// =============================================================================

#[tokio::test]
async fn test_patch_item() {
    let fixture = TestFixture::new();
    let ids = fixture.enqueue_files(&["a.png"], 16).await;
    let path = format!("/api/v1/items/{}", ids[0]);

    fixture
        .patch(&path, json!({ "add_tags": ["cats", "dogs"] }))
        .await;
    let response = fixture
        .patch(
            &path,
            json!({ "description": "pets", "remove_tags": ["dogs"] }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["description"], "pets");
    assert_eq!(response.body["tags"], json!(["cats"]));
}

#[tokio::test]
async fn test_patch_completed_item_conflicts() {
    let fixture = TestFixture::new();
    let ids = fixture.enqueue_files(&["a.png"], 16).await;
    fixture.orchestrator.run().await.unwrap();

    let response = fixture
        .patch(
            &format!("/api/v1/items/{}", ids[0]),
            json!({ "description": "too late" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_item_releases_preview() {
    let fixture = TestFixture::new();
    let ids = fixture.enqueue_files(&["a.png", "b.png"], 16).await;

    let response = fixture.delete(&format!("/api/v1/items/{}", ids[0])).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(fixture.previews.stats().revoked, 1);

    let again = fixture.delete(&format!("/api/v1/items/{}", ids[0])).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let list = fixture.get("/api/v1/items").await;
    assert_eq!(list.body["total"], 1);
}

#[tokio::test]
async fn test_clear_completed() {
    let fixture = TestFixture::new();
    fixture.transport.fail_name("b.png", server_error()).await;
    fixture.enqueue_files(&["a.png", "b.png", "c.png"], 16).await;
    fixture.orchestrator.run().await.unwrap();

    let response = fixture.post_empty("/api/v1/items/clear-completed").await;

    assert_eq!(response.body["count"], 2);
    let list = fixture.get("/api/v1/items").await;
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["items"][0]["status"], "failed");
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_select_tag_and_remove() {
    let fixture = TestFixture::new();
    let ids = fixture
        .enqueue_files(&["a.png", "b.png", "c.png"], 16)
        .await;

    let selected = fixture
        .post(
            "/api/v1/items/select",
            json!({ "ids": [ids[0], ids[2], "unknown"] }),
        )
        .await;
    assert_eq!(selected.body["count"], 2);

    let tagged = fixture
        .post("/api/v1/items/tag-selected", json!({ "tag": "keep" }))
        .await;
    assert_eq!(tagged.body["count"], 2);

    let item = fixture.get(&format!("/api/v1/items/{}", ids[2])).await;
    assert_eq!(item.body["selected"], true);
    assert_eq!(item.body["tags"], json!(["keep"]));

    let removed = fixture.post_empty("/api/v1/items/remove-selected").await;
    assert_eq!(removed.body["count"], 2);

    let list = fixture.get("/api/v1/items").await;
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["items"][0]["id"], ids[1]);
}

#[tokio::test]
async fn test_select_all_and_clear() {
    let fixture = TestFixture::new();
    fixture.enqueue_files(&["a.png", "b.png"], 16).await;

    let response = fixture
        .post("/api/v1/items/select", json!({ "all": true }))
        .await;
    assert_eq!(response.body["count"], 2);
    assert_eq!(fixture.orchestrator.selected_ids().await.len(), 2);

    fixture
        .post(
            "/api/v1/items/select",
            json!({ "all": true, "selected": false }),
        )
        .await;
    assert!(fixture.orchestrator.selected_ids().await.is_empty());
}

#[tokio::test]
async fn test_tag_selected_rejects_blank_tag() {
    let fixture = TestFixture::new();

    let response = fixture
        .post("/api/v1/items/tag-selected", json!({ "tag": "  " }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Events, metrics and disposal
// =============================================================================

#[tokio::test]
async fn test_events_are_broadcast() {
    let fixture = TestFixture::new();
    let mut rx = fixture.ws_broadcaster.subscribe();

    let ids = fixture.enqueue_files(&["a.png"], 16).await;

    let msg = rx.recv().await.unwrap();
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "upload");
    assert_eq!(json["event"]["event"], "item_queued");
    assert_eq!(json["event"]["item_id"], ids[0]);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.enqueue_files(&["a.png", "b.png"], 16).await;
    fixture.get("/api/v1/items").await;

    let text = fixture.metrics_text().await;

    assert!(text.contains("mediaflow_items_by_status"));
    assert!(text.contains("mediaflow_http_requests_total"));
}

#[tokio::test]
async fn test_disposed_orchestrator_is_gone() {
    let fixture = TestFixture::new();
    fixture.enqueue_files(&["a.png"], 16).await;
    fixture.orchestrator.dispose().await;

    let retry = fixture.post_empty("/api/v1/items/retry-all").await;
    assert_eq!(retry.status, StatusCode::GONE);

    let start = fixture.post_empty("/api/v1/session/start").await;
    assert_eq!(start.status, StatusCode::GONE);

    let list = fixture.get("/api/v1/items").await;
    assert_eq!(list.body["total"], 0);
}
