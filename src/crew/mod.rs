//! Crew orchestrator
//!
//! Runs a fixed set of tasks in dependency order, one at a time. Each task sees
//! the outputs of the tasks it lists as context; the last task's output is the
//! crew result. The first failing task aborts the run and nothing partial is
//! returned.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::info;

use crate::agents::{financial_profiles, Agent, ExecutionSettings, TaskInvocation};
use crate::document::DocumentLoader;
use crate::llm::LLM;
use crate::tasks::{financial_tasks, KickoffInputs, TaskDescriptor};
use crate::tools::{Tool, ToolRegistry};
use crate::types::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl std::fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

struct PlannedTask {
    descriptor: TaskDescriptor,
    agent: usize,
    context: Vec<usize>,
    tools: Option<Vec<Arc<dyn Tool>>>,
}

pub struct Crew {
    agents: Vec<Arc<Agent>>,
    tasks: Vec<PlannedTask>,
    order: Vec<usize>,
}

impl Crew {
    pub fn new(
        agents: Vec<Arc<Agent>>,
        tasks: Vec<TaskDescriptor>,
        registry: &ToolRegistry,
    ) -> AppResult<Self> {
        if tasks.is_empty() {
            return Err(AppError::Config("Crew has no tasks".to_string()));
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.as_str(), i).is_some() {
                return Err(AppError::Config(format!("Duplicate task name '{}'", task.name)));
            }
        }

        let mut planned = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let agent = agents
                .iter()
                .position(|a| a.name() == task.agent)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "Task '{}' is assigned to unknown agent '{}'",
                        task.name, task.agent
                    ))
                })?;

            let context = task
                .context
                .iter()
                .map(|dep| {
                    index.get(dep.as_str()).copied().ok_or_else(|| {
                        AppError::Config(format!(
                            "Task '{}' depends on unknown task '{}'",
                            task.name, dep
                        ))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?;

            let tools = if task.tools.is_empty() {
                None
            } else {
                if let Some(missing) = task.tools.iter().find(|t| !registry.contains(t)) {
                    return Err(AppError::Config(format!(
                        "Task '{}' uses unknown tool '{}'",
                        task.name, missing
                    )));
                }
                Some(registry.select(&task.tools))
            };

            planned.push(PlannedTask {
                descriptor: task.clone(),
                agent,
                context,
                tools,
            });
        }

        let order = topological_order(&planned)?;

        Ok(Self {
            agents,
            tasks: planned,
            order,
        })
    }

    /// The verify → analyze → risk → invest crew
    pub fn financial(
        llm: LLM,
        settings: ExecutionSettings,
        loader: Arc<dyn DocumentLoader>,
    ) -> AppResult<Self> {
        let registry = ToolRegistry::financial(loader);
        let agents = financial_profiles()
            .into_iter()
            .map(|profile| Agent::new(profile, llm.clone(), settings.clone(), &registry).map(Arc::new))
            .collect::<AppResult<Vec<_>>>()?;
        Self::new(agents, financial_tasks(), &registry)
    }

    pub fn agent_names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name().to_string()).collect()
    }

    /// Task names in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.tasks[i].descriptor.name.as_str())
            .collect()
    }

    pub async fn kickoff(&self, inputs: &KickoffInputs) -> AppResult<CrewOutput> {
        let mut outputs: Vec<Option<String>> = vec![None; self.tasks.len()];

        for &i in &self.order {
            let task = &self.tasks[i];
            let agent = &self.agents[task.agent];

            // topological order guarantees every upstream output is present
            let context = task
                .context
                .iter()
                .filter_map(|&dep| outputs[dep].as_deref())
                .collect::<Vec<_>>()
                .join("\n\n");
            let description = inputs.render(&task.descriptor.description);
            let expected_output = inputs.render(&task.descriptor.expected_output);

            let coworkers: Vec<Arc<Agent>> = if agent.allows_delegation() {
                self.agents
                    .iter()
                    .filter(|a| !Arc::ptr_eq(a, agent))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            info!(task = %task.descriptor.name, agent = %agent.name(), "Starting task");

            let raw = agent
                .execute(
                    TaskInvocation {
                        description: &description,
                        expected_output: &expected_output,
                        context: &context,
                        tools: task.tools.as_deref(),
                    },
                    inputs,
                    &coworkers,
                )
                .await
                .map_err(|e| AppError::Pipeline {
                    task: task.descriptor.name.clone(),
                    message: e.to_string(),
                })?;

            info!(task = %task.descriptor.name, output_len = raw.len(), "Task complete");
            outputs[i] = Some(raw);
        }

        let tasks_output: Vec<TaskOutput> = self
            .order
            .iter()
            .map(|&i| TaskOutput {
                task: self.tasks[i].descriptor.name.clone(),
                agent: self.agents[self.tasks[i].agent].name().to_string(),
                raw: outputs[i].take().unwrap_or_default(),
            })
            .collect();
        let raw = tasks_output.last().map(|o| o.raw.clone()).unwrap_or_default();

        Ok(CrewOutput { raw, tasks_output })
    }
}

/// Kahn's algorithm; among ready tasks the earliest declared runs first
fn topological_order(tasks: &[PlannedTask]) -> AppResult<Vec<usize>> {
    let mut indegree: Vec<usize> = tasks.iter().map(|t| t.context.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    for (i, task) in tasks.iter().enumerate() {
        for &dep in &task.context {
            dependents[dep].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..tasks.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != tasks.len() {
        let stuck: Vec<&str> = (0..tasks.len())
            .filter(|i| !order.contains(i))
            .map(|i| tasks[i].descriptor.name.as_str())
            .collect();
        return Err(AppError::Config(format!(
            "Task dependencies form a cycle: {}",
            stuck.join(", ")
        )));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::profiles;
    use crate::document::PdfDocumentLoader;
    use crate::tasks::financial::{ANALYSIS_TASK, INVESTMENT_TASK, RISK_ASSESSMENT_TASK, VERIFICATION_TASK};
    use crate::testing::{fast_settings, financial_crew, scripted_llm, ScriptedAdapter};

    fn registry() -> ToolRegistry {
        ToolRegistry::financial(Arc::new(PdfDocumentLoader::new()))
    }

    fn single_agent() -> Vec<Arc<Agent>> {
        let llm = scripted_llm(Arc::new(ScriptedAdapter::final_answers()));
        vec![Arc::new(
            Agent::new(profiles::verifier(), llm, fast_settings(), &registry()).unwrap(),
        )]
    }

    fn task(name: &str, deps: &[&str]) -> TaskDescriptor {
        TaskDescriptor::new(name, profiles::VERIFIER, "do it", "done").with_context(deps)
    }

    #[test]
    fn test_financial_order() {
        let crew = financial_crew(Arc::new(ScriptedAdapter::final_answers()));
        assert_eq!(
            crew.execution_order(),
            vec![VERIFICATION_TASK, ANALYSIS_TASK, RISK_ASSESSMENT_TASK, INVESTMENT_TASK]
        );
        assert_eq!(
            crew.agent_names(),
            vec!["verifier", "financial_analyst", "risk_assessor", "investment_advisor"]
        );
    }

    #[test]
    fn test_order_respects_dependencies_over_declaration() {
        let tasks = vec![task("report", &["gather"]), task("gather", &[]), task("audit", &[])];
        let crew = Crew::new(single_agent(), tasks, &registry()).unwrap();
        assert_eq!(crew.execution_order(), vec!["gather", "report", "audit"]);
    }

    #[test]
    fn test_invalid_graphs_rejected() {
        let cycle = vec![task("a", &["b"]), task("b", &["a"])];
        let err = Crew::new(single_agent(), cycle, &registry()).err().unwrap();
        assert!(err.to_string().contains("cycle"));

        let unknown = vec![task("a", &["ghost"])];
        assert!(Crew::new(single_agent(), unknown, &registry()).is_err());

        let duplicate = vec![task("a", &[]), task("a", &[])];
        assert!(Crew::new(single_agent(), duplicate, &registry()).is_err());

        let orphan = vec![TaskDescriptor::new("a", "nobody", "d", "e")];
        assert!(Crew::new(single_agent(), orphan, &registry()).is_err());

        assert!(Crew::new(single_agent(), vec![], &registry()).is_err());
    }

    #[tokio::test]
    async fn test_kickoff_passes_context_forward() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            "Final Answer: VERIFIED".to_string(),
            "Final Answer: ANALYSIS".to_string(),
            "Final Answer: RISK".to_string(),
            "Final Answer: INVEST".to_string(),
        ]));
        let crew = financial_crew(adapter.clone());
        let inputs = KickoffInputs::new("Is this a good investment?", "data/id_report.pdf");

        let output = crew.kickoff(&inputs).await.unwrap();
        assert_eq!(output.raw, "INVEST");
        assert_eq!(output.to_string(), "INVEST");
        assert_eq!(output.tasks_output.len(), 4);
        assert_eq!(output.tasks_output[2].agent, "risk_assessor");

        let requests = adapter.requests().await;
        assert_eq!(requests.len(), 4);
        let prompts: Vec<&str> = requests.iter().map(|r| r.messages[0].content.as_str()).collect();

        assert!(prompts[0].contains("Document path: data/id_report.pdf"));
        assert!(prompts[0].contains("User query: Is this a good investment?"));
        assert!(!prompts[0].contains("context you're working with"));
        assert!(prompts[1].contains("VERIFIED"));
        assert!(prompts[2].contains("ANALYSIS"));
        assert!(!prompts[2].contains("VERIFIED"));
        let invest_context = prompts[3].split("context you're working with:\n").nth(1).unwrap();
        assert!(invest_context.starts_with("ANALYSIS\n\nRISK"));
    }

    #[tokio::test]
    async fn test_task_tools_override_agent_tools() {
        let adapter = Arc::new(ScriptedAdapter::final_answers());
        let crew = financial_crew(adapter.clone());
        crew.kickoff(&KickoffInputs::new("q", "p")).await.unwrap();

        let requests = adapter.requests().await;
        let risk_system = requests[2].system_instruction.clone().unwrap();
        assert!(risk_system.contains("assess_risk_indicators"));
        // the analysis task restricts the analyst to the document reader
        let analyst_system = requests[1].system_instruction.clone().unwrap();
        assert!(analyst_system.contains("read_financial_document"));
        assert!(!analyst_system.contains("assess_risk_indicators"));
    }

    #[tokio::test]
    async fn test_failing_stage_aborts_chain() {
        let adapter = Arc::new(ScriptedAdapter::with_results(vec![
            Ok("Final Answer: VERIFIED".to_string()),
            Err("quota exhausted".to_string()),
        ]));
        let crew = financial_crew(adapter.clone());

        let err = crew.kickoff(&KickoffInputs::new("q", "p")).await.unwrap_err();
        match err {
            AppError::Pipeline { task, message } => {
                assert_eq!(task, ANALYSIS_TASK);
                assert!(message.contains("quota exhausted"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // risk and investment never ran
        assert_eq!(adapter.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_document_still_completes() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            "Action: read_financial_document\nAction Input: data/nope.pdf".to_string(),
        ]));
        let crew = financial_crew(adapter.clone());

        let output = crew
            .kickoff(&KickoffInputs::new("q", "data/nope.pdf"))
            .await
            .unwrap();
        assert_eq!(output.raw, "Certified Investment Advisor report");

        let requests = adapter.requests().await;
        assert!(requests[1].messages.last().unwrap().content.contains("File not found"));
    }
}
