use axum::{
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::models::{AnalysisResult, AppState};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/result/{analysis_id}", get(get_result))
        .with_state(state)
}

async fn get_result(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> AppResult<ResponseJson<AnalysisResult>> {
    debug!(analysis_id = %analysis_id, "Looking up cached result");

    state
        .results
        .get(&analysis_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Analysis result not found".to_string()))
}
