//! Agent System
//!
//! Four personas work one financial report in sequence:
//!
//! ```text
//! Uploaded PDF
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Verifier   │  → Confirms it is a financial report, extracts metadata
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Analyst    │  → Metrics, trends, answer to the query
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │    Risk     │  → Risk ratings and mitigations
//! │  Assessor   │
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Advisor    │  → Investment recommendation (final output)
//! └─────────────┘
//! ```
//!
//! An [`Agent`] is a profile bound to the shared LLM client. It keeps no state
//! between calls apart from its rate limiter, so one instance serves all requests.

pub mod executor;
pub mod profiles;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::config::LLMConfig;
use crate::llm::LLM;
use crate::tools::{Tool, ToolRegistry};
use crate::types::{AppError, AppResult};

pub use executor::{parse_step, AgentStep, TaskInvocation, DELEGATE_TOOL};
pub use profiles::{agent_names, financial_profiles};

#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    /// May reference `{query}`
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<String>,
    pub max_iter: u32,
    /// LLM calls per minute; 0 disables limiting
    pub max_rpm: u32,
    pub allow_delegation: bool,
}

/// Per-call LLM parameters shared by every agent
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl From<&LLMConfig> for ExecutionSettings {
    fn from(config: &LLMConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_attempts: config.max_retries.saturating_add(1),
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub struct Agent {
    profile: AgentProfile,
    llm: LLM,
    settings: ExecutionSettings,
    tools: Vec<Arc<dyn Tool>>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Agent {
    pub fn new(
        profile: AgentProfile,
        llm: LLM,
        settings: ExecutionSettings,
        registry: &ToolRegistry,
    ) -> AppResult<Self> {
        if let Some(missing) = profile.tools.iter().find(|name| !registry.contains(name)) {
            return Err(AppError::Config(format!(
                "Agent '{}' uses unknown tool '{}'",
                profile.name, missing
            )));
        }
        let tools = registry.select(&profile.tools);
        let limiter = NonZeroU32::new(profile.max_rpm)
            .map(|rpm| RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            profile,
            llm,
            settings,
            tools,
            limiter,
        })
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn role(&self) -> &str {
        &self.profile.role
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn allows_delegation(&self) -> bool {
        self.profile.allow_delegation
    }

    /// Matches the agent name or role, ignoring case
    pub fn answers_to(&self, who: &str) -> bool {
        let who = who.trim();
        self.profile.name.eq_ignore_ascii_case(who) || self.profile.role.eq_ignore_ascii_case(who)
    }

    /// Waits for a rate limit slot; never fails
    async fn wait_for_slot(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocumentLoader;
    use crate::testing::ScriptedAdapter;

    fn registry() -> ToolRegistry {
        ToolRegistry::financial(Arc::new(PdfDocumentLoader::new()))
    }

    #[test]
    fn test_profiles_match_crew_contract() {
        let profiles = financial_profiles();
        assert_eq!(
            agent_names(),
            vec!["verifier", "financial_analyst", "risk_assessor", "investment_advisor"]
        );
        for profile in &profiles {
            assert_eq!(profile.max_iter, 5);
            assert_eq!(profile.max_rpm, 10);
            assert!(profile.allow_delegation);
            assert!(profile.tools.contains(&"read_financial_document".to_string()));
        }
        assert!(profiles[1].goal.contains("{query}"));
    }

    #[test]
    fn test_unknown_tool_rejected() {
        let mut profile = profiles::verifier();
        profile.tools.push("search_the_internet".to_string());
        let llm = LLM::with_adapter("scripted", Arc::new(ScriptedAdapter::final_answers()));
        let settings = crate::testing::fast_settings();

        let result = Agent::new(profile, llm, settings, &registry());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_answers_to_name_or_role() {
        let llm = LLM::with_adapter("scripted", Arc::new(ScriptedAdapter::final_answers()));
        let agent = Agent::new(
            profiles::risk_assessor(),
            llm,
            crate::testing::fast_settings(),
            &registry(),
        )
        .unwrap();

        assert!(agent.answers_to("risk_assessor"));
        assert!(agent.answers_to("chief risk officer"));
        assert!(!agent.answers_to("verifier"));
        assert_eq!(agent.tools().len(), 2);
    }

    #[test]
    fn test_attempts_follow_retry_setting() {
        let mut config = LLMConfig {
            provider: "google".to_string(),
            api_key: "key".to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 3,
            api_base: None,
        };
        assert_eq!(ExecutionSettings::from(&config).max_attempts, 4);

        config.max_retries = u32::MAX;
        assert_eq!(ExecutionSettings::from(&config).max_attempts, u32::MAX);
    }
}
