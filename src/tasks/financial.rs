// The four-stage financial document chain: verify -> analyze -> assess risk -> recommend

use super::TaskDescriptor;
use crate::agents::profiles::{FINANCIAL_ANALYST, INVESTMENT_ADVISOR, RISK_ASSESSOR, VERIFIER};
use crate::tools::financial_document::READ_DOCUMENT_TOOL;

pub const VERIFICATION_TASK: &str = "verification";
pub const ANALYSIS_TASK: &str = "financial_analysis";
pub const RISK_ASSESSMENT_TASK: &str = "risk_assessment";
pub const INVESTMENT_TASK: &str = "investment_recommendations";

pub fn verification_task() -> TaskDescriptor {
    TaskDescriptor::new(
        VERIFICATION_TASK,
        VERIFIER,
        "Verify if the uploaded document is a legitimate financial report.

Steps:
1. Read the document content from the provided path
2. Identify document type, company name, report period if available
3. Check for key financial sections (balance sheet, income statement, cash flow)
4. Provide verification status and document metadata

User query: {query}
Document path: {file_path}",
        "A structured verification report containing:
- Document type verification (is it a financial document? yes/no)
- Company name (if identifiable)
- Report period/date
- Key sections identified
- Confidence score (0-100%)
- Any red flags or concerns",
    )
    .with_tools(&[READ_DOCUMENT_TOOL])
}

pub fn analysis_task() -> TaskDescriptor {
    TaskDescriptor::new(
        ANALYSIS_TASK,
        FINANCIAL_ANALYST,
        "Analyze the financial document thoroughly.

Based on the verified document, provide comprehensive financial analysis:
1. Extract key financial metrics (revenue, profit, margins, etc.)
2. Identify trends and significant changes
3. Compare with industry benchmarks if available
4. Highlight notable achievements or concerns
5. Answer the user's specific query: {query}

Use the verified document content from the verification step.
Document path: {file_path}",
        "A detailed financial analysis including:
- Executive summary of financial health
- Key metrics table with period-over-period changes
- Trend analysis (at least 3 key trends)
- Strengths identified (3-5 points)
- Areas of concern (3-5 points)
- Direct answer to user's query",
    )
    .with_context(&[VERIFICATION_TASK])
    .with_tools(&[READ_DOCUMENT_TOOL])
}

pub fn risk_assessment_task() -> TaskDescriptor {
    TaskDescriptor::new(
        RISK_ASSESSMENT_TASK,
        RISK_ASSESSOR,
        "Evaluate risks based on the financial analysis.

Using the financial analysis results, provide comprehensive risk assessment:
1. Identify financial risks (liquidity, solvency, profitability risks)
2. Assess market and operational risks
3. Evaluate regulatory and compliance risks
4. Provide risk ratings (low/medium/high) with justification
5. Suggest risk mitigation strategies

User query context: {query}",
        "A structured risk assessment with:
- Overall risk rating (Low/Medium/High)
- Categorized risks (Financial, Operational, Market, Regulatory)
- Each risk with: description, likelihood, impact, mitigation strategy
- Risk heat map or prioritization
- Recommendations for risk management",
    )
    .with_context(&[ANALYSIS_TASK])
}

pub fn investment_task() -> TaskDescriptor {
    TaskDescriptor::new(
        INVESTMENT_TASK,
        INVESTMENT_ADVISOR,
        "Generate investment recommendations based on all previous analyses.

Using the financial analysis and risk assessment, provide:
1. Investment thesis for the company
2. Specific recommendations (Buy/Hold/Sell) with rationale
3. Suggested allocation based on risk profile
4. Time horizon considerations
5. Alternative investment options

Address the user's specific query: {query}",
        "A comprehensive investment recommendation including:
- Investment summary (1 paragraph)
- Recommendation rating (Strong Buy/Buy/Hold/Sell/Strong Sell)
- Key investment highlights (3-5 points)
- Key risks to monitor (3-5 points)
- Suggested position sizing (% of portfolio)
- Price targets (if applicable)
- Monitoring checklist",
    )
    .with_context(&[ANALYSIS_TASK, RISK_ASSESSMENT_TASK])
}

/// All four tasks in declaration order
pub fn financial_tasks() -> Vec<TaskDescriptor> {
    vec![
        verification_task(),
        analysis_task(),
        risk_assessment_task(),
        investment_task(),
    ]
}
