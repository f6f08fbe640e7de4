//! Task descriptors
//!
//! A task binds one agent to an instruction template and names the upstream
//! tasks whose output becomes its context. Descriptors are immutable and shared
//! by every request; run-time values arrive through [`KickoffInputs`].

pub mod financial;

pub use financial::{
    analysis_task, financial_tasks, investment_task, risk_assessment_task, verification_task,
};

/// Values substituted into `{query}` and `{file_path}` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct KickoffInputs {
    pub query: String,
    pub file_path: String,
}

impl KickoffInputs {
    pub fn new(query: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            file_path: file_path.into(),
        }
    }

    /// Single pass, so placeholder-looking text inside the values stays as is
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + self.query.len());
        let mut rest = template;
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix("{query}") {
                out.push_str(&self.query);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{file_path}") {
                out.push_str(&self.file_path);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    /// Name of the agent that performs the task
    pub agent: String,
    /// Upstream task names, in the order their outputs are concatenated
    pub context: Vec<String>,
    /// Tool names overriding the agent's own set; empty means use the agent's
    pub tools: Vec<String>,
}

impl TaskDescriptor {
    pub fn new(
        name: impl Into<String>,
        agent: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent: agent.into(),
            context: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_context(mut self, upstream: &[&str]) -> Self {
        self.context = upstream.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|s| s.to_string()).collect();
        self
    }
}
