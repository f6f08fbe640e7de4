//! HTTP routes
//!
//! - `GET /` - service descriptor
//! - `POST /analyze` - upload and analyze a PDF
//! - `GET /result/{analysis_id}` - cached analysis
//! - `GET /health` - liveness and cache size

pub mod analyze;
pub mod health;
pub mod results;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the application router with tracing, CORS and the upload size limit
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.cors_allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(health::router(state.clone()))
        .merge(analyze::router(state.clone()))
        .merge(results::router(state))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
