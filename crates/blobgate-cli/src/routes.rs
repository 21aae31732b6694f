//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{http::StatusCode, middleware as axum_middleware, routing::any, Router};
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the main router.
///
/// Every route accepts any method. Paths whose `{object}` segment is not a
/// valid key, or that have extra segments, get `404 Not Found`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let write_timeout = state.config.write_timeout;

    Router::new()
        .route("/get/{object}", any(handlers::get_object))
        .route("/put/{object}", any(handlers::put_object))
        .route("/get-blob/{object}", any(handlers::get_blob))
        .route("/put-blob/{object}", any(handlers::put_blob))
        // Apply middleware
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            write_timeout,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
