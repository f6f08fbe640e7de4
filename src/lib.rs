// Financial Document Analyzer - multi-agent LLM analysis of uploaded PDF reports

pub mod agents;
pub mod cache;
pub mod config;
pub mod crew;
pub mod document;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod tasks;
pub mod testing; // scripted LLM and crew builders for tests
pub mod tools;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
