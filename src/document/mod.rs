//! Document Loader
//!
//! Turns an uploaded PDF into plain text for the agents. Loading never fails:
//! a missing file or a broken PDF comes back as a readable error line in the
//! normal return value, and the agents treat it as document content.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn read(&self, path: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDocumentLoader;

impl PdfDocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Blocking extraction; callers on the runtime go through `read`
    pub fn read_blocking(path: &str) -> String {
        if !Path::new(path).exists() {
            return format!("Error: File not found at {}", path);
        }

        let document = match lopdf::Document::load(path) {
            Ok(doc) => doc,
            Err(e) => return format!("Error reading PDF file: {}", e),
        };

        let mut full_report = String::new();
        for page_number in document.get_pages().keys() {
            let content = match document.extract_text(&[*page_number]) {
                Ok(text) => text,
                Err(e) => return format!("Error reading PDF file: {}", e),
            };
            full_report.push_str(&collapse_whitespace(&content));
            full_report.push_str("\n\n");
        }

        if full_report.trim().is_empty() {
            "No text content extracted from PDF".to_string()
        } else {
            full_report
        }
    }
}

#[async_trait]
impl DocumentLoader for PdfDocumentLoader {
    async fn read(&self, path: &str) -> String {
        let owned = path.to_string();
        let text = tokio::task::spawn_blocking(move || Self::read_blocking(&owned))
            .await
            .unwrap_or_else(|e| format!("Error reading PDF file: {}", e));
        debug!(path, chars = text.len(), "Document loaded");
        text
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
