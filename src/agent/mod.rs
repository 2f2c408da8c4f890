//! Agent collaborator layer.
//!
//! Defines the immutable description of one generation step (an `Agent`),
//! the polymorphic `Tool` capability interface, and the client/runner pair
//! that drives an agent against the hosted Gemini API.

mod error;
mod gemini;
mod runner;

pub use error::{BackendError, BackendResult};
pub use gemini::{
    Content, GeminiClient, GenerateContentRequest, GenerateContentResponse, Part, RetryPolicy,
};
pub use runner::Runner;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// An immutable description of one generation step: a name, a model
/// identifier, an instruction string, and the capabilities the model may
/// call while answering. Constructed once at startup and shared read-only
/// across all sessions.
#[derive(Clone)]
pub struct Agent {
    pub name: String,
    pub model: String,
    pub instruction: String,
    /// Attach the backend's built-in search capability. Search execution
    /// itself happens inside the hosted API.
    pub builtin_search: bool,
    pub tools: Vec<Arc<dyn Tool>>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instruction: instruction.into(),
            builtin_search: false,
            tools: Vec::new(),
        }
    }

    pub fn with_search(mut self) -> Self {
        self.builtin_search = true;
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("builtin_search", &self.builtin_search)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A callable capability an agent may invoke while generating its answer.
///
/// Tools are exposed to the model as function declarations taking a single
/// `request` string argument.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Invoke the tool with the model-supplied arguments and return its
    /// textual result.
    async fn invoke(&self, args: &Value) -> BackendResult<String>;
}

/// An agent wrapped as a callable tool, so one agent can delegate a request
/// to another.
pub struct AgentTool {
    agent: Agent,
    runner: Runner,
    description: String,
}

impl AgentTool {
    pub fn new(agent: Agent, runner: Runner, description: impl Into<String>) -> Self {
        Self {
            agent,
            runner,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.agent.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, args: &Value) -> BackendResult<String> {
        let request = args
            .get("request")
            .and_then(Value::as_str)
            .unwrap_or_default();
        self.runner.run(&self.agent, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_builder() {
        let agent = Agent::new("researcher", "gemini-2.5-flash-lite", "Find facts.")
            .with_search();
        assert_eq!(agent.name, "researcher");
        assert!(agent.builtin_search);
        assert!(agent.tools.is_empty());
    }

    #[test]
    fn test_tool_lookup_by_name() {
        struct Echo;

        #[async_trait]
        impl Tool for Echo {
            fn name(&self) -> &str {
                "echo"
            }
            fn description(&self) -> &str {
                "echoes the request"
            }
            async fn invoke(&self, args: &Value) -> BackendResult<String> {
                Ok(args.to_string())
            }
        }

        let agent = Agent::new("a", "m", "i").with_tool(Arc::new(Echo));
        assert!(agent.tool("echo").is_some());
        assert!(agent.tool("other").is_none());
    }
}
