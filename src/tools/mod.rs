//! Agent tools
//!
//! A tool takes a single text input and always answers with text. Problems are
//! reported inside that text so an agent can read them and carry on.

pub mod financial_document;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use financial_document::{InvestmentAnalysisTool, ReadFinancialDocumentTool, RiskAssessmentTool};

use crate::document::DocumentLoader;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, input: &str) -> String;
}

/// Named tools shared by every agent in a crew
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document tools backed by `loader`
    pub fn financial(loader: Arc<dyn DocumentLoader>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ReadFinancialDocumentTool::new(loader.clone())));
        registry.register(Arc::new(InvestmentAnalysisTool::new(loader.clone())));
        registry.register(Arc::new(RiskAssessmentTool::new(loader)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Resolve `names` in order; unknown names are skipped
    pub fn select(&self, names: &[String]) -> Vec<Arc<dyn Tool>> {
        names.iter().filter_map(|name| self.get(name)).collect()
    }
}

/// Accepts `path`, `"path"` or `{"path": "..."}`
pub fn parse_path_input(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(path) = ["path", "file_path"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            {
                return path.to_string();
            }
        }
    }
    trimmed
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocumentLoader;

    #[test]
    fn test_parse_path_input() {
        assert_eq!(parse_path_input("data/a.pdf"), "data/a.pdf");
        assert_eq!(parse_path_input("  \"data/a.pdf\"\n"), "data/a.pdf");
        assert_eq!(parse_path_input(r#"{"path": "data/b.pdf"}"#), "data/b.pdf");
        assert_eq!(parse_path_input(r#"{"file_path": "data/c.pdf"}"#), "data/c.pdf");
    }

    #[test]
    fn test_registry_select_skips_unknown() {
        let registry = ToolRegistry::financial(Arc::new(PdfDocumentLoader::new()));
        let selected = registry.select(&[
            "read_financial_document".to_string(),
            "search_the_internet".to_string(),
        ]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "read_financial_document");
        assert!(registry.contains("assess_risk_indicators"));
    }
}
