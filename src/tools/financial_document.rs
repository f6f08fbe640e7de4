use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::{parse_path_input, Tool};
use crate::document::DocumentLoader;

pub const READ_DOCUMENT_TOOL: &str = "read_financial_document";
pub const INVESTMENT_TOOL: &str = "analyze_investment_data";
pub const RISK_TOOL: &str = "assess_risk_indicators";

const FINANCIAL_TERMS: [&str; 5] = ["revenue", "profit", "loss", "earnings", "cash"];

pub struct ReadFinancialDocumentTool {
    loader: Arc<dyn DocumentLoader>,
}

impl ReadFinancialDocumentTool {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for ReadFinancialDocumentTool {
    fn name(&self) -> &str {
        READ_DOCUMENT_TOOL
    }

    fn description(&self) -> &str {
        "Read the full text of a PDF financial document. Input: the document path."
    }

    async fn run(&self, input: &str) -> String {
        let path = parse_path_input(input);
        if path.is_empty() {
            return "Error: no document path provided".to_string();
        }
        self.loader.read(&path).await
    }
}

/// Input is either a document path or the document text itself
async fn resolve_document(loader: &dyn DocumentLoader, input: &str) -> String {
    let candidate = parse_path_input(input);
    if !candidate.is_empty() && !candidate.contains('\n') && Path::new(&candidate).is_file() {
        loader.read(&candidate).await
    } else {
        input.trim().to_string()
    }
}

pub struct InvestmentAnalysisTool {
    loader: Arc<dyn DocumentLoader>,
}

impl InvestmentAnalysisTool {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for InvestmentAnalysisTool {
    fn name(&self) -> &str {
        INVESTMENT_TOOL
    }

    fn description(&self) -> &str {
        "Quick screen of financial document data for investment analysis. Input: a document path or the document text."
    }

    async fn run(&self, input: &str) -> String {
        let data = resolve_document(self.loader.as_ref(), input).await;
        investment_summary(&data)
    }
}

pub fn investment_summary(data: &str) -> String {
    if data.is_empty() {
        return "No financial data provided for analysis".to_string();
    }
    let lower = data.to_lowercase();
    let has_terms = FINANCIAL_TERMS.iter().any(|term| lower.contains(term));
    format!(
        "Investment analysis complete. Document size: {} characters. Contains financial terms: {}",
        data.chars().count(),
        has_terms
    )
}

pub struct RiskAssessmentTool {
    loader: Arc<dyn DocumentLoader>,
}

impl RiskAssessmentTool {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for RiskAssessmentTool {
    fn name(&self) -> &str {
        RISK_TOOL
    }

    fn description(&self) -> &str {
        "Scan financial document data for basic risk indicators. Input: a document path or the document text."
    }

    async fn run(&self, input: &str) -> String {
        let data = resolve_document(self.loader.as_ref(), input).await;
        risk_summary(&data)
    }
}

pub fn risk_summary(data: &str) -> String {
    if data.is_empty() {
        return "No financial data provided for risk assessment".to_string();
    }
    let lower = data.to_lowercase();
    let mut indicators = Vec::new();
    if lower.contains("debt") {
        indicators.push("Debt mentioned - requires further analysis");
    }
    if lower.contains("volatility") {
        indicators.push("Volatility indicators present");
    }

    let listed = if indicators.is_empty() {
        "No immediate risk factors identified".to_string()
    } else {
        indicators.join(", ")
    };
    format!(
        "Risk assessment complete. Identified {} risk factors: {}",
        indicators.len(),
        listed
    )
}
