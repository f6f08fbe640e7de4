use std::sync::Arc;

use async_trait::async_trait;
use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for an LLM provider
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
    pub api_base: Option<String>,
}

impl From<&LLMConfig> for LLMProviderConfig {
    fn from(config: &LLMConfig) -> Self {
        Self {
            name: config.provider.clone(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

/// Shared LLM client. Holds no per-call state, so one instance serves every request.
#[derive(Clone)]
pub struct LLM {
    adapter: Arc<dyn LLMAdapter>,
    provider_name: String,
}

impl LLM {
    pub fn new(provider: LLMProviderConfig) -> AppResult<Self> {
        let adapter: Arc<dyn LLMAdapter> = match provider.name.as_str() {
            "google" => Arc::new(match provider.api_base {
                Some(base) => crate::llm::google::GoogleAdapter::with_api_base(&provider.api_key, &base),
                None => crate::llm::google::GoogleAdapter::new(&provider.api_key),
            }),
            "openai" => Arc::new(match provider.api_base {
                Some(base) => crate::llm::openai::OpenAIAdapter::with_api_base(&provider.api_key, &base),
                None => crate::llm::openai::OpenAIAdapter::new(&provider.api_key),
            }),
            other => {
                return Err(AppError::Config(format!("Unsupported provider: {}", other)));
            }
        };

        Ok(Self {
            adapter,
            provider_name: provider.name,
        })
    }

    /// Wrap an existing adapter, e.g. a scripted one in tests
    pub fn with_adapter(provider_name: impl Into<String>, adapter: Arc<dyn LLMAdapter>) -> Self {
        Self {
            adapter,
            provider_name: provider_name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_providers() {
        for name in ["google", "openai"] {
            let llm = LLM::new(LLMProviderConfig {
                name: name.to_string(),
                api_key: "test-key".to_string(),
                api_base: None,
            })
            .unwrap();
            assert_eq!(llm.provider_name(), name);
        }
    }

    #[test]
    fn test_unknown_provider() {
        let result = LLM::new(LLMProviderConfig {
            name: "anthropic".to_string(),
            api_key: "test-key".to_string(),
            api_base: None,
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
