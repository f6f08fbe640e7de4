use std::collections::BTreeMap;

use axum::{extract::State, response::Json as ResponseJson, routing::get, Json, Router};

use crate::models::{AppState, HealthResponse, ServiceDescriptor};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn service_info() -> ResponseJson<ServiceDescriptor> {
    let endpoints = BTreeMap::from([
        (
            "POST /analyze".to_string(),
            "Upload and analyze financial document".to_string(),
        ),
        (
            "GET /result/{analysis_id}".to_string(),
            "Retrieve previous analysis result".to_string(),
        ),
        ("GET /health".to_string(), "Service health and cache size".to_string()),
    ]);

    Json(ServiceDescriptor {
        status: "online".to_string(),
        service: "Financial Document Analyzer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}

async fn health_check(State(state): State<AppState>) -> ResponseJson<HealthResponse> {
    let cached = state.results.len().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage: format!("{} results cached", cached),
        agents: state.crew.agent_names(),
    })
}
