//! Multipart HTTP upload to the remote media store.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::CredentialProvider;
use crate::config::RemoteConfig;
use crate::validator::MediaSource;

use super::{ProgressReporter, TransferRequest, TransportError, UploadTransport};

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_ERROR_BODY: usize = 200;

#[derive(Serialize)]
struct MetadataPart<'a> {
    tags: Vec<&'a str>,
    description: &'a str,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: Option<String>,
    media_id: Option<String>,
}

/// Streams each item as `multipart/form-data` to
/// `POST {base_url}/collections/{collection_id}/media`.
pub struct HttpUploadTransport {
    client: Client,
    upload_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpUploadTransport {
    pub fn new(
        config: &RemoteConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let upload_url = format!(
            "{}/collections/{}/media",
            config.base_url.trim_end_matches('/'),
            urlencoding::encode(&config.collection_id)
        );

        Ok(Self {
            client,
            upload_url,
            credentials,
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    async fn send(
        &self,
        request: TransferRequest,
        progress: ProgressReporter,
    ) -> Result<String, TransportError> {
        let read_error: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let body = open_source(&request.source).await?;
        let body = counting_body(body, request.size_bytes, progress.clone(), read_error.clone());

        let file_part = Part::stream_with_length(body, request.size_bytes)
            .file_name(request.name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| TransportError::Internal(format!("invalid MIME type: {}", e)))?;
        let mut form = Form::new().part("file", file_part);

        if request.has_metadata() {
            let metadata = MetadataPart {
                tags: request.tags.iter().map(String::as_str).collect(),
                description: &request.description,
            };
            let json = serde_json::to_string(&metadata)
                .map_err(|e| TransportError::Internal(e.to_string()))?;
            let part = Part::text(json)
                .mime_str("application/json")
                .map_err(|e| TransportError::Internal(e.to_string()))?;
            form = form.part("metadata", part);
        }

        let mut builder = self.client.post(&self.upload_url).multipart(form);
        let credential = self
            .credentials
            .credential()
            .await
            .map_err(|e| TransportError::Credential(e.to_string()))?;
        if let Some(credential) = credential {
            builder = builder.header(reqwest::header::AUTHORIZATION, credential.header_value());
        }

        progress.report(0, Some(request.size_bytes));
        debug!(item_id = %request.item_id, url = %self.upload_url, "Sending upload");

        let response = builder.send().await.map_err(|e| {
            if let Some(msg) = take_read_error(&read_error) {
                return TransportError::Io(msg);
            }
            TransportError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text);
            warn!(item_id = %request.item_id, status = status.as_u16(), %message, "Upload rejected");
            return Err(TransportError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = serde_json::from_str(&text)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        parsed
            .id
            .or(parsed.media_id)
            .ok_or_else(|| TransportError::InvalidResponse("response has no id".to_string()))
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<String, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Aborted),
            result = self.send(request, progress) => result,
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync>>;

async fn open_source(source: &MediaSource) -> Result<ChunkStream, TransportError> {
    match source {
        MediaSource::Path(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| TransportError::Io(format!("{}: {}", path.display(), e)))?;
            Ok(Box::pin(ReaderStream::with_capacity(file, CHUNK_SIZE)))
        }
        MediaSource::Memory(data) => {
            let chunks: Vec<Result<Bytes, std::io::Error>> = (0..data.len())
                .step_by(CHUNK_SIZE)
                .map(|start| Ok(data.slice(start..(start + CHUNK_SIZE).min(data.len()))))
                .collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }
}

/// Wrap a chunk stream so every chunk handed to the socket is reported.
fn counting_body(
    chunks: ChunkStream,
    total: u64,
    progress: ProgressReporter,
    read_error: Arc<Mutex<Option<String>>>,
) -> Body {
    let mut sent = 0u64;
    let counted = chunks.map(move |chunk| {
        match &chunk {
            Ok(bytes) => {
                sent += bytes.len() as u64;
                progress.report(sent, Some(total));
            }
            Err(e) => {
                if let Ok(mut slot) = read_error.lock() {
                    *slot = Some(e.to_string());
                }
            }
        }
        chunk
    });
    Body::wrap_stream(counted)
}

fn take_read_error(slot: &Mutex<Option<String>>) -> Option<String> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

/// Prefer a structured `error`/`message` field, else a truncated body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}
