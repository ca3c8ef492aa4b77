//! Common test utilities for API testing with mocks.
//!
//! Builds the real router over an orchestrator whose transport and
//! preview generator are mocks, so requests run in-process.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediaflow_core::{
    load_config_from_str,
    testing::{MockPreviewGenerator, MockTransport},
    BatchConfig, Config, UploadEvent, UploadOrchestrator,
};
use mediaflow_server::api::{create_router, WsBroadcaster};
use mediaflow_server::state::AppState;

const TEST_CONFIG: &str = r#"
[remote]
base_url = "http://127.0.0.1:9/api"
collection_id = "test-collection"

[auth]
method = "bearer"
token = "super-secret"
"#;

/// Test fixture wiring the router to mock dependencies.
pub struct TestFixture {
    pub router: Router,
    pub orchestrator: Arc<UploadOrchestrator>,
    pub transport: Arc<MockTransport>,
    pub previews: Arc<MockPreviewGenerator>,
    pub ws_broadcaster: WsBroadcaster,
    /// Directory holding files created with [`TestFixture::write_file`]
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_transport(MockTransport::new())
    }

    pub fn with_transport(transport: MockTransport) -> Self {
        let config = load_config_from_str(TEST_CONFIG).expect("test config should parse");
        Self::build(config.batch.clone(), transport, config)
    }

    pub fn with_batch(batch: BatchConfig) -> Self {
        let config = load_config_from_str(TEST_CONFIG).expect("test config should parse");
        Self::build(batch, MockTransport::new(), config)
    }

    fn build(batch: BatchConfig, transport: MockTransport, config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let transport = Arc::new(transport);
        let previews = Arc::new(MockPreviewGenerator::new());

        let ws_broadcaster = WsBroadcaster::default();
        let broadcaster = ws_broadcaster.clone();
        let orchestrator = Arc::new(
            UploadOrchestrator::new(batch, transport.clone(), Some(previews.clone()))
                .expect("valid batch config")
                .with_event_callback(Arc::new(move |event: &UploadEvent| {
                    broadcaster.upload_event(event)
                })),
        );

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&orchestrator),
            ws_broadcaster.clone(),
        ));

        Self {
            router: create_router(state),
            orchestrator,
            transport,
            previews,
            ws_broadcaster,
            temp_dir,
        }
    }

    /// Write `size` bytes to a file in the fixture's temp dir.
    pub fn write_file(&self, name: &str, size: usize) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("Failed to create file");
        file.write_all(&vec![7u8; size]).expect("Failed to write file");
        path
    }

    /// Enqueue local files through the API and return the accepted ids.
    pub async fn enqueue_files(&self, names: &[&str], size: usize) -> Vec<String> {
        let paths: Vec<PathBuf> = names.iter().map(|n| self.write_file(n, size)).collect();
        let response = self
            .post("/api/v1/items", serde_json::json!({ "paths": paths }))
            .await;
        response.body["results"]
            .as_array()
            .expect("results should be an array")
            .iter()
            .filter_map(|r| r["item_id"].as_str().map(String::from))
            .collect()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Fetch the raw Prometheus text.
    pub async fn metrics_text(&self) -> String {
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = match body {
            Some(json) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_string(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request_builder.body(body).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
