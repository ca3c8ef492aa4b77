use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, items, middleware::metrics_middleware, session, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Queue
        .route("/items", get(items::list_items).post(items::enqueue_items))
        .route(
            "/items/{id}",
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/{id}/retry", post(items::retry_item))
        .route("/items/retry-all", post(items::retry_all))
        .route("/items/clear-completed", post(items::clear_completed))
        // Selection
        .route("/items/select", post(items::select_items))
        .route("/items/tag-selected", post(items::tag_selected))
        .route("/items/remove-selected", post(items::remove_selected))
        // Session
        .route("/session", get(session::get_session))
        .route("/session/start", post(session::start_session))
        .route("/session/cancel", post(session::cancel_session))
        // Live events
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
