//! Test doubles
//!
//! A scripted LLM adapter plus helpers to assemble the financial crew and app state
//! without any network access.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tokio::sync::Mutex;

use crate::agents::ExecutionSettings;
use crate::cache::ResultCache;
use crate::crew::Crew;
use crate::document::PdfDocumentLoader;
use crate::llm::{LLMAdapter, LLM};
use crate::models::AppState;
use crate::storage::ScratchStore;
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage};

enum Behaviour {
    /// Replies in order; once exhausted falls back to role answers
    Script(VecDeque<Result<String, String>>),
    /// "Final Answer: <role> report" taken from the system prompt
    RoleAnswers,
    Failing(String),
}

pub struct ScriptedAdapter {
    behaviour: Mutex<Behaviour>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl ScriptedAdapter {
    pub fn new(replies: Vec<String>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<String, String>>) -> Self {
        Self::from_behaviour(Behaviour::Script(results.into()))
    }

    pub fn final_answers() -> Self {
        Self::from_behaviour(Behaviour::RoleAnswers)
    }

    pub fn failing(message: &str) -> Self {
        Self::from_behaviour(Behaviour::Failing(message.to_string()))
    }

    fn from_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().await.clone()
    }

    fn role_answer(request: &LLMRequest) -> String {
        let role = request
            .system_instruction
            .as_deref()
            .and_then(|s| s.strip_prefix("You are "))
            .and_then(|s| s.split_once('.'))
            .map(|(role, _)| role.to_string())
            .unwrap_or_else(|| "Agent".to_string());
        format!("Thought: I now know the final answer\nFinal Answer: {} report", role)
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.requests.lock().await.push(request.clone());

        let reply = match &mut *self.behaviour.lock().await {
            Behaviour::Script(queue) => queue
                .pop_front()
                .unwrap_or_else(|| Ok(Self::role_answer(request))),
            Behaviour::RoleAnswers => Ok(Self::role_answer(request)),
            Behaviour::Failing(message) => Err(message.clone()),
        };

        match reply {
            Ok(content) => Ok(LLMResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: TokenUsage::default(),
            }),
            Err(message) => Err(AppError::LLMApi(message)),
        }
    }
}

/// No retries and no backoff
pub fn fast_settings() -> ExecutionSettings {
    ExecutionSettings {
        model: "test-model".to_string(),
        temperature: 0.0,
        max_tokens: 512,
        max_attempts: 1,
        retry_base_delay: Duration::from_millis(1),
    }
}

pub fn scripted_llm(adapter: Arc<ScriptedAdapter>) -> LLM {
    LLM::with_adapter("scripted", adapter)
}

/// The real four-stage crew driven by `adapter`
pub fn financial_crew(adapter: Arc<ScriptedAdapter>) -> Crew {
    Crew::financial(
        scripted_llm(adapter),
        fast_settings(),
        Arc::new(PdfDocumentLoader::new()),
    )
    .expect("financial crew wiring is valid")
}

/// App state over `adapter` with scratch files under `data_dir`
pub fn app_state(adapter: Arc<ScriptedAdapter>, data_dir: &Path, capacity: usize) -> AppState {
    AppState::new(
        financial_crew(adapter),
        ResultCache::new(capacity),
        ScratchStore::new(data_dir),
    )
}

/// A one-page PDF whose only content is `line` in Courier
pub fn text_pdf_bytes(line: &str) -> anyhow::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
