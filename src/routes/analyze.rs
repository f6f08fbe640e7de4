//! `POST /analyze`
//!
//! Reads the multipart form, stores the upload as a scratch file, runs the crew
//! over it and optionally caches the result. The scratch file is removed after
//! the response has been handed off, whatever the outcome.

use std::path::Path;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnalysisResult, AppState};
use crate::storage::ScratchCleanup;
use crate::tasks::KickoffInputs;
use crate::types::{AppError, AppResult};

pub const DEFAULT_QUERY: &str = "Analyze this financial document and provide investment insights";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze_document))
        .with_state(state)
}

#[derive(Debug)]
struct AnalyzeForm {
    file_name: String,
    bytes: Bytes,
    /// As submitted; the crew gets the trimmed form
    query: String,
    store_result: bool,
}

async fn analyze_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let multipart = multipart.map_err(|r| AppError::UnprocessableEntity(r.body_text()))?;
    let form = read_form(multipart).await?;

    if !is_pdf(&form.file_name) {
        return Err(AppError::InvalidRequest(
            "Only PDF files are supported".to_string(),
        ));
    }

    let analysis_id = Uuid::now_v7().to_string();
    let timestamp = chrono::Utc::now().to_rfc3339();
    let path = state.scratch.path_for(&analysis_id, &form.file_name);
    // armed before the write so a partial file is removed too
    let cleanup = ScratchCleanup::new(path.clone());

    info!(
        analysis_id = %analysis_id,
        file_name = %form.file_name,
        bytes = form.bytes.len(),
        "Starting analysis"
    );

    let mut response = match run_analysis(&state, &form, &path).await {
        Ok(analysis) => {
            let result = AnalysisResult {
                status: "success".to_string(),
                analysis_id: analysis_id.clone(),
                timestamp,
                query: form.query,
                file_name: form.file_name,
                analysis,
                agents_used: state.crew.agent_names(),
            };
            if form.store_result {
                state.results.insert(result.clone()).await;
            }
            info!(analysis_id = %analysis_id, stored = form.store_result, "Analysis complete");
            Json(result).into_response()
        }
        Err(e) => {
            warn!(analysis_id = %analysis_id, error = %e, "Analysis failed");
            AppError::processing(e).into_response()
        }
    };

    response.extensions_mut().insert(cleanup);
    Ok(response)
}

async fn run_analysis(state: &AppState, form: &AnalyzeForm, path: &Path) -> AppResult<String> {
    state.scratch.persist(path, &form.bytes).await?;

    let inputs = KickoffInputs::new(form.query.trim(), path.to_string_lossy());
    let output = state.crew.kickoff(&inputs).await?;
    Ok(output.raw)
}

async fn read_form(mut multipart: Multipart) -> AppResult<AnalyzeForm> {
    let mut file: Option<(String, Bytes)> = None;
    let mut query: Option<String> = None;
    let mut store_result: Option<bool> = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(form_error)?;
                file = Some((file_name, bytes));
            }
            "query" => query = Some(field.text().await.map_err(form_error)?),
            "store_result" => {
                let raw = field.text().await.map_err(form_error)?;
                let flag = parse_flag(&raw).ok_or_else(|| {
                    AppError::UnprocessableEntity(format!(
                        "Field 'store_result' must be a boolean, got '{}'",
                        raw
                    ))
                })?;
                store_result = Some(flag);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| {
        AppError::UnprocessableEntity("Field 'file' is required".to_string())
    })?;

    Ok(AnalyzeForm {
        file_name,
        bytes,
        query: query.unwrap_or_else(|| DEFAULT_QUERY.to_string()),
        store_result: store_result.unwrap_or(true),
    })
}

fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::UnprocessableEntity(err.body_text())
    }
}

fn is_pdf(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".pdf")
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
