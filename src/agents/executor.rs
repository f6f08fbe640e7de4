//! Agent execution loop
//!
//! Each turn the model either calls a tool (`Action:` / `Action Input:`) or
//! finishes (`Final Answer:`). Tool results go back as `Observation:` messages.
//! When `max_iter` turns pass without a final answer the agent asks once more,
//! this time for the answer only, and returns whatever comes back.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::Agent;
use crate::tasks::KickoffInputs;
use crate::tools::Tool;
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};
use crate::utils::with_retry;

pub const DELEGATE_TOOL: &str = "delegate_work";

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";
const OBSERVATION_MARKER: &str = "Observation:";

const DELEGATED_EXPECTED_OUTPUT: &str =
    "Your best answer to your coworker asking you this, accounting for the context shared.";

const FORCE_FINAL_ANSWER: &str = "You have reached the maximum number of steps. \
Do not use any more tools. Respond now with your best complete answer, starting with \"Final Answer:\".";

/// One task as handed to an agent, already rendered
pub struct TaskInvocation<'a> {
    pub description: &'a str,
    pub expected_output: &'a str,
    pub context: &'a str,
    /// Overrides the agent's own tools when set
    pub tools: Option<&'a [Arc<dyn Tool>]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    Action { tool: String, input: String },
    FinalAnswer(String),
}

/// Whichever of `Action:` (at a line start) or `Final Answer:` comes first wins.
/// A reply with neither is taken as the final answer.
pub fn parse_step(reply: &str) -> AgentStep {
    let final_pos = reply.find(FINAL_ANSWER_MARKER);
    let action_pos = find_line_marker(reply, ACTION_MARKER);

    match (action_pos, final_pos) {
        (Some(action), final_pos) if final_pos.map_or(true, |f| action < f) => {
            parse_action(&reply[action + ACTION_MARKER.len()..])
        }
        (_, Some(f)) => AgentStep::FinalAnswer(reply[f + FINAL_ANSWER_MARKER.len()..].trim().to_string()),
        _ => AgentStep::FinalAnswer(reply.trim().to_string()),
    }
}

fn find_line_marker(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(marker) {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

fn parse_action(after_marker: &str) -> AgentStep {
    let (tool_line, rest) = after_marker.split_once('\n').unwrap_or((after_marker, ""));
    let tool = tool_line
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '[' || c == ']')
        .trim()
        .to_string();

    let input = match find_line_marker(rest, ACTION_INPUT_MARKER) {
        Some(pos) => {
            let raw = &rest[pos + ACTION_INPUT_MARKER.len()..];
            let raw = match find_line_marker(raw, OBSERVATION_MARKER) {
                Some(end) => &raw[..end],
                None => raw,
            };
            raw.trim().to_string()
        }
        None => String::new(),
    };

    AgentStep::Action { tool, input }
}

#[derive(Debug, Deserialize)]
struct DelegationRequest {
    coworker: String,
    task: String,
    #[serde(default)]
    context: String,
}

impl Agent {
    /// Run one task to a final answer.
    ///
    /// `coworkers` are the agents this one may delegate to; delegated work runs
    /// with no coworkers of its own.
    pub fn execute<'a>(
        &'a self,
        task: TaskInvocation<'a>,
        inputs: &'a KickoffInputs,
        coworkers: &'a [Arc<Agent>],
    ) -> BoxFuture<'a, AppResult<String>> {
        async move {
            let tools = task.tools.unwrap_or(self.tools.as_slice());
            let coworkers: Vec<&Arc<Agent>> = if self.profile.allow_delegation {
                coworkers.iter().filter(|c| c.name() != self.name()).collect()
            } else {
                Vec::new()
            };

            let system = self.system_prompt(inputs, tools, &coworkers);
            let mut messages = vec![LLMMessage::user(task_prompt(&task))];

            for iteration in 1..=self.profile.max_iter {
                let reply = self.complete(&system, &messages).await?;

                match parse_step(&reply) {
                    AgentStep::FinalAnswer(answer) => {
                        info!(agent = %self.name(), iteration, answer_len = answer.len(), "Agent finished");
                        return Ok(answer);
                    }
                    AgentStep::Action { tool, input } => {
                        debug!(agent = %self.name(), iteration, tool = %tool, "Agent action");
                        let observation = self
                            .perform(&tool, &input, tools, inputs, &coworkers)
                            .await?;
                        messages.push(LLMMessage::assistant(reply));
                        messages.push(LLMMessage::user(format!(
                            "{} {}",
                            OBSERVATION_MARKER, observation
                        )));
                    }
                }
            }

            warn!(
                agent = %self.name(),
                max_iter = self.profile.max_iter,
                "Iteration cap reached, forcing final answer"
            );
            messages.push(LLMMessage::user(FORCE_FINAL_ANSWER));
            let reply = self.complete(&system, &messages).await?;
            Ok(match parse_step(&reply) {
                AgentStep::FinalAnswer(answer) => answer,
                AgentStep::Action { .. } => reply.trim().to_string(),
            })
        }
        .boxed()
    }

    async fn perform(
        &self,
        tool: &str,
        input: &str,
        tools: &[Arc<dyn Tool>],
        inputs: &KickoffInputs,
        coworkers: &[&Arc<Agent>],
    ) -> AppResult<String> {
        if tool == DELEGATE_TOOL {
            if coworkers.is_empty() {
                return Ok("Error: delegation is not available for this task. Use your own tools.".to_string());
            }
            return self.delegate(input, inputs, coworkers).await;
        }

        match tools.iter().find(|t| t.name() == tool) {
            Some(found) => Ok(found.run(input).await),
            None => {
                let mut available: Vec<&str> = tools.iter().map(|t| t.name()).collect();
                if !coworkers.is_empty() {
                    available.push(DELEGATE_TOOL);
                }
                Ok(format!(
                    "Error: '{}' is not a valid tool, try one of [{}].",
                    tool,
                    available.join(", ")
                ))
            }
        }
    }

    async fn delegate(
        &self,
        input: &str,
        inputs: &KickoffInputs,
        coworkers: &[&Arc<Agent>],
    ) -> AppResult<String> {
        let request: DelegationRequest = match serde_json::from_str(input.trim()) {
            Ok(request) => request,
            Err(e) => {
                return Ok(format!(
                    "Error: invalid delegation input ({}). Provide a JSON object with \"coworker\", \"task\" and \"context\".",
                    e
                ));
            }
        };

        let Some(coworker) = coworkers.iter().find(|c| c.answers_to(&request.coworker)) else {
            let roles: Vec<&str> = coworkers.iter().map(|c| c.role()).collect();
            return Ok(format!(
                "Error: no coworker named '{}'. Choose one of [{}].",
                request.coworker,
                roles.join(", ")
            ));
        };

        info!(from = %self.name(), to = %coworker.name(), "Delegating work");
        coworker
            .execute(
                TaskInvocation {
                    description: &request.task,
                    expected_output: DELEGATED_EXPECTED_OUTPUT,
                    context: &request.context,
                    tools: None,
                },
                inputs,
                &[],
            )
            .await
    }

    async fn complete(&self, system: &str, messages: &[LLMMessage]) -> AppResult<String> {
        let request = LLMRequest {
            model: self.settings.model.clone(),
            messages: messages.to_vec(),
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(self.settings.temperature),
            system_instruction: Some(system.to_string()),
        };
        let request = &request;

        let response = with_retry(
            move || async move {
                self.wait_for_slot().await;
                let response = self.llm.create_chat_completion(request).await?;
                if response.content.trim().is_empty() {
                    return Err(AppError::LLMApi(
                        "Invalid response from LLM call - empty content".to_string(),
                    ));
                }
                Ok(response)
            },
            self.settings.max_attempts,
            self.settings.retry_base_delay,
        )
        .await?;

        debug!(
            agent = %self.name(),
            total_tokens = response.usage.total_tokens,
            finish_reason = %response.finish_reason,
            "LLM call complete"
        );
        Ok(response.content)
    }

    fn system_prompt(
        &self,
        inputs: &KickoffInputs,
        tools: &[Arc<dyn Tool>],
        coworkers: &[&Arc<Agent>],
    ) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}\n",
            self.profile.role,
            self.profile.backstory,
            inputs.render(&self.profile.goal)
        );

        let mut tool_lines: Vec<String> = tools
            .iter()
            .map(|t| format!("Tool Name: {}\nTool Description: {}", t.name(), t.description()))
            .collect();
        if !coworkers.is_empty() {
            let roles: Vec<&str> = coworkers.iter().map(|c| c.role()).collect();
            tool_lines.push(format!(
                "Tool Name: {}\nTool Description: Delegate a specific task to one of the following coworkers: [{}]. \
                 Input: a JSON object with \"coworker\" (the role), \"task\" (everything they need to do) and \
                 \"context\" (everything they need to know, they know nothing about your task).",
                DELEGATE_TOOL,
                roles.join(", ")
            ));
        }

        if tool_lines.is_empty() {
            prompt.push_str(
                "\nTo give my best complete final answer to the task respond using the exact following format:\n\n\
                 Thought: I now can give a great answer\n\
                 Final Answer: Your final answer must be the great and the most complete as possible, it must be outcome described.\n",
            );
            return prompt;
        }

        let names: Vec<&str> = tools
            .iter()
            .map(|t| t.name())
            .chain((!coworkers.is_empty()).then_some(DELEGATE_TOOL))
            .collect();

        prompt.push_str("\nYou ONLY have access to the following tools, and should NEVER make up tools that are not listed here:\n\n");
        prompt.push_str(&tool_lines.join("\n\n"));
        prompt.push_str(&format!(
            "\n\nUse the following format:\n\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, only one name of [{}], just the name, exactly as it's written.\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\n\
             Once all necessary information is gathered:\n\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n",
            names.join(", ")
        ));
        prompt
    }
}

fn task_prompt(task: &TaskInvocation<'_>) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         you MUST return the actual complete content as the final answer, not a summary.",
        task.description.trim(),
        task.expected_output.trim()
    );
    if !task.context.trim().is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(task.context.trim());
    }
    prompt.push_str("\n\nBegin! This is VERY important to you, use the tools available and give your best Final Answer, your job depends on it!\n\nThought:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{profiles, ExecutionSettings};
    use crate::document::PdfDocumentLoader;
    use crate::llm::LLM;
    use crate::testing::{fast_settings, ScriptedAdapter};
    use crate::tools::ToolRegistry;

    fn build(profile: crate::agents::AgentProfile, adapter: Arc<ScriptedAdapter>) -> Agent {
        build_with(profile, adapter, fast_settings())
    }

    fn build_with(
        profile: crate::agents::AgentProfile,
        adapter: Arc<ScriptedAdapter>,
        settings: ExecutionSettings,
    ) -> Agent {
        let registry = ToolRegistry::financial(Arc::new(PdfDocumentLoader::new()));
        let llm = LLM::with_adapter("scripted", adapter);
        Agent::new(profile, llm, settings, &registry).unwrap()
    }

    fn invocation<'a>(description: &'a str) -> TaskInvocation<'a> {
        TaskInvocation {
            description,
            expected_output: "A report",
            context: "",
            tools: None,
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let step = parse_step("Thought: I now know the final answer\nFinal Answer: Buy, strong margins");
        assert_eq!(step, AgentStep::FinalAnswer("Buy, strong margins".to_string()));
    }

    #[test]
    fn test_parse_plain_reply_is_final() {
        assert_eq!(
            parse_step("  The company looks healthy.  "),
            AgentStep::FinalAnswer("The company looks healthy.".to_string())
        );
    }

    #[test]
    fn test_parse_action_with_input() {
        let step = parse_step(
            "Thought: read it\nAction: `read_financial_document`\nAction Input: \"data/r.pdf\"\nObservation: made up",
        );
        assert_eq!(
            step,
            AgentStep::Action {
                tool: "read_financial_document".to_string(),
                input: "\"data/r.pdf\"".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_action_before_final_answer_wins() {
        let step = parse_step("Action: delegate_work\nAction Input: {}\nFinal Answer: too early");
        assert!(matches!(step, AgentStep::Action { ref tool, .. } if tool == "delegate_work"));

        let step = parse_step("Final Answer: done.\nAction: not a real action");
        assert_eq!(step, AgentStep::FinalAnswer("done.\nAction: not a real action".to_string()));
    }

    #[tokio::test]
    async fn test_tool_observation_is_fed_back() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            "Action: read_financial_document\nAction Input: data/missing.pdf".to_string(),
            "Final Answer: Document unreadable, cannot verify".to_string(),
        ]));
        let agent = build(profiles::verifier(), adapter.clone());
        let inputs = KickoffInputs::new("q", "data/missing.pdf");

        let answer = agent.execute(invocation("Verify"), &inputs, &[]).await.unwrap();
        assert_eq!(answer, "Document unreadable, cannot verify");

        let requests = adapter.requests().await;
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.content, "Observation: Error: File not found at data/missing.pdf");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_not_fatal() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            "Action: search_the_internet\nAction Input: ACME".to_string(),
            "Final Answer: ok".to_string(),
        ]));
        let agent = build(profiles::verifier(), adapter.clone());
        let inputs = KickoffInputs::new("q", "p");

        assert_eq!(agent.execute(invocation("t"), &inputs, &[]).await.unwrap(), "ok");
        let requests = adapter.requests().await;
        assert!(requests[1].messages.last().unwrap().content.contains("is not a valid tool"));
    }

    #[tokio::test]
    async fn test_iteration_cap_forces_final_answer() {
        let mut replies = vec!["Action: read_financial_document\nAction Input: x.pdf".to_string(); 2];
        replies.push("Final Answer: best effort".to_string());
        let adapter = Arc::new(ScriptedAdapter::new(replies));
        let mut profile = profiles::verifier();
        profile.max_iter = 2;
        let agent = build(profile, adapter.clone());
        let inputs = KickoffInputs::new("q", "p");

        let answer = agent.execute(invocation("t"), &inputs, &[]).await.unwrap();
        assert_eq!(answer, "best effort");
        let requests = adapter.requests().await;
        assert_eq!(requests.len(), 3);
        assert!(requests[2].messages.last().unwrap().content.contains("maximum number of steps"));
    }

    #[tokio::test]
    async fn test_goal_renders_query() {
        let adapter = Arc::new(ScriptedAdapter::final_answers());
        let agent = build(profiles::financial_analyst(), adapter.clone());
        let inputs = KickoffInputs::new("Is revenue growing?", "p");

        agent.execute(invocation("t"), &inputs, &[]).await.unwrap();
        let system = adapter.requests().await[0].system_instruction.clone().unwrap();
        assert!(system.contains("You are Senior Financial Analyst."));
        assert!(system.contains("based on actual data: Is revenue growing?"));
    }

    #[tokio::test]
    async fn test_delegation_reaches_coworker() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            r#"Action: delegate_work
Action Input: {"coworker": "Chief Risk Officer", "task": "Rate the leverage", "context": "Debt doubled"}"#
                .to_string(),
            "Final Answer: Leverage risk is high".to_string(),
            "Final Answer: Hold, leverage risk is high".to_string(),
        ]));
        let analyst = build(profiles::financial_analyst(), adapter.clone());
        let risk = Arc::new(build(profiles::risk_assessor(), adapter.clone()));
        let inputs = KickoffInputs::new("q", "p");

        let answer = analyst
            .execute(invocation("Analyze"), &inputs, &[risk])
            .await
            .unwrap();
        assert_eq!(answer, "Hold, leverage risk is high");

        let requests = adapter.requests().await;
        assert_eq!(requests.len(), 3);
        let delegated_system = requests[1].system_instruction.clone().unwrap();
        assert!(delegated_system.contains("You are Chief Risk Officer."));
        // delegated work cannot delegate again
        assert!(!delegated_system.contains(DELEGATE_TOOL));
        assert!(requests[1].messages[0].content.contains("Rate the leverage"));
        assert_eq!(
            requests[2].messages.last().unwrap().content,
            "Observation: Leverage risk is high"
        );
    }

    #[tokio::test]
    async fn test_bad_delegation_input_is_observation() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            "Action: delegate_work\nAction Input: ask the risk guy".to_string(),
            "Final Answer: fine".to_string(),
        ]));
        let analyst = build(profiles::financial_analyst(), adapter.clone());
        let risk = Arc::new(build(profiles::risk_assessor(), adapter.clone()));
        let inputs = KickoffInputs::new("q", "p");

        assert_eq!(
            analyst.execute(invocation("t"), &inputs, &[risk]).await.unwrap(),
            "fine"
        );
        let requests = adapter.requests().await;
        assert!(requests[1]
            .messages
            .last()
            .unwrap()
            .content
            .contains("invalid delegation input"));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates_after_retries() {
        let adapter = Arc::new(ScriptedAdapter::failing("provider down"));
        let mut settings = fast_settings();
        settings.max_attempts = 2;
        let agent = build_with(profiles::verifier(), adapter.clone(), settings);
        let inputs = KickoffInputs::new("q", "p");

        let err = agent.execute(invocation("t"), &inputs, &[]).await.unwrap_err();
        assert!(err.to_string().contains("provider down"));
        assert_eq!(adapter.requests().await.len(), 2);
    }
}
