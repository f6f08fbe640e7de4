use std::sync::Arc;

use crate::cache::ResultCache;
use crate::crew::Crew;
use crate::storage::ScratchStore;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared handler state. Built once at startup; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub crew: Arc<Crew>,
    pub results: ResultCache,
    pub scratch: ScratchStore,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(crew: Crew, results: ResultCache, scratch: ScratchStore) -> Self {
        Self {
            crew: Arc::new(crew),
            results,
            scratch,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = origins;
        self
    }
}

/// One completed analysis, as returned by `/analyze` and `/result/{analysis_id}`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub status: String,
    pub analysis_id: String,
    pub timestamp: String,
    pub query: String,
    pub file_name: String,
    pub analysis: String,
    pub agents_used: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ServiceDescriptor {
    pub status: String,
    pub service: String,
    pub version: String,
    pub endpoints: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
    pub agents: Vec<String>,
}
