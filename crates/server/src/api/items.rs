//! Queue item API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use mediaflow_core::{EnqueueOutcome, FileDescriptor, ItemSnapshot, RejectReason};

use super::handlers::{api_error, orchestrator_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for adding local files to the queue
#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    pub paths: Vec<PathBuf>,
    /// Tags applied to every accepted item
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    /// Override the MIME type inferred from each extension
    pub mime_type: Option<String>,
}

/// Result for one requested path
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnqueueResult {
    Accepted { path: PathBuf, item_id: String },
    Rejected { path: PathBuf, reason: RejectReason },
    /// The path could not be read as a regular file
    Unreadable { path: PathBuf, error: String },
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub accepted: usize,
    pub results: Vec<EnqueueResult>,
}

#[derive(Debug, Serialize)]
pub struct ListItemsResponse {
    pub items: Vec<ItemSnapshot>,
    pub total: usize,
}

/// Request body for editing an item's metadata
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemBody {
    pub description: Option<String>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

/// Request body for changing the selection
#[derive(Debug, Deserialize)]
pub struct SelectBody {
    /// Items to change; ignored when `all` is set
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub all: bool,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TagBody {
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List queued items in insertion order
pub async fn list_items(State(state): State<Arc<AppState>>) -> Json<ListItemsResponse> {
    let items = state.orchestrator().items().await;
    Json(ListItemsResponse {
        total: items.len(),
        items,
    })
}

/// Get a single item
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemSnapshot>, ApiError> {
    state
        .orchestrator()
        .item(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("item not found: {}", id)))
}

/// Add local files to the queue. Every path gets its own result.
pub async fn enqueue_items(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueBody>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    if body.paths.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "paths must not be empty"));
    }

    let mut results: Vec<Option<EnqueueResult>> = Vec::with_capacity(body.paths.len());
    let mut readable = Vec::new();
    let mut files = Vec::new();

    for path in body.paths {
        match FileDescriptor::from_path(&path).await {
            Ok(file) => {
                let mut file = file.with_tags(&body.tags);
                if let Some(mime) = &body.mime_type {
                    file = file.with_mime_type(mime.clone());
                }
                if let Some(description) = &body.description {
                    file = file.with_description(description.clone());
                }
                files.push(file);
                readable.push((results.len(), path));
                results.push(None);
            }
            Err(e) => {
                warn!("Cannot enqueue {:?}: {}", path, e);
                results.push(Some(EnqueueResult::Unreadable {
                    path,
                    error: e.to_string(),
                }));
            }
        }
    }

    let outcomes = state
        .orchestrator()
        .enqueue(files)
        .await
        .map_err(orchestrator_error)?;

    // Outcomes come back in the order the files were passed in.
    let mut accepted = 0;
    for ((slot, path), outcome) in readable.into_iter().zip(outcomes) {
        results[slot] = Some(match outcome {
            EnqueueOutcome::Accepted { item_id, .. } => {
                accepted += 1;
                EnqueueResult::Accepted { path, item_id }
            }
            EnqueueOutcome::Rejected { reason, .. } => EnqueueResult::Rejected { path, reason },
        });
    }
    let results = results.into_iter().flatten().collect();

    let status = if accepted > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(EnqueueResponse { accepted, results })))
}

/// Edit description and tags of a pending or failed item
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateItemBody>,
) -> Result<Json<ItemSnapshot>, ApiError> {
    let orchestrator = state.orchestrator();

    if let Some(description) = body.description {
        orchestrator
            .set_description(&id, description)
            .await
            .map_err(orchestrator_error)?;
    }
    for tag in &body.add_tags {
        orchestrator
            .add_tag(&id, tag)
            .await
            .map_err(orchestrator_error)?;
    }
    for tag in &body.remove_tags {
        orchestrator
            .remove_tag(&id, tag)
            .await
            .map_err(orchestrator_error)?;
    }

    get_item(State(state), Path(id)).await
}

/// Remove an item from the queue
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator()
        .remove_item(&id)
        .await
        .map_err(orchestrator_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Retry one failed item
pub async fn retry_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ItemSnapshot>), ApiError> {
    state
        .orchestrator()
        .retry(&id)
        .await
        .map_err(orchestrator_error)?;
    let Json(item) = get_item(State(state), Path(id)).await?;
    Ok((StatusCode::ACCEPTED, Json(item)))
}

/// Retry every failed item
pub async fn retry_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .orchestrator()
        .retry_all()
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(CountResponse { count }))
}

/// Remove every completed item
pub async fn clear_completed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .orchestrator()
        .clear_completed()
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(CountResponse { count }))
}

/// Change which items are selected
pub async fn select_items(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectBody>,
) -> Result<Json<CountResponse>, ApiError> {
    let orchestrator = state.orchestrator();
    let count = if body.all {
        orchestrator
            .select_all(body.selected)
            .await
            .map_err(orchestrator_error)?;
        orchestrator.items().await.len()
    } else {
        orchestrator
            .select(&body.ids, body.selected)
            .await
            .map_err(orchestrator_error)?
    };
    Ok(Json(CountResponse { count }))
}

/// Add a tag to every selected, editable item
pub async fn tag_selected(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TagBody>,
) -> Result<Json<CountResponse>, ApiError> {
    if body.tag.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "tag must not be empty"));
    }
    let count = state
        .orchestrator()
        .tag_selected(&body.tag)
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(CountResponse { count }))
}

/// Remove every selected item that is not uploading
pub async fn remove_selected(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .orchestrator()
        .remove_selected()
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(CountResponse { count }))
}
