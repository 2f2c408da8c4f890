//! Runner: drives an agent, and any tools it calls, to a final answer.

use tracing::debug;

use super::Agent;
use super::error::{BackendError, BackendResult};
use super::gemini::{Content, GeminiClient, GenerateContentRequest};

/// Upper bound on model->tool->model rounds for one run.
const MAX_TOOL_ROUNDS: usize = 4;

/// Executes an agent against an input string and returns the final rendered
/// answer text. If the model responds with a function call, the named tool
/// is invoked and its result fed back, up to `MAX_TOOL_ROUNDS` times.
#[derive(Debug, Clone)]
pub struct Runner {
    client: GeminiClient,
}

impl Runner {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub async fn run(&self, agent: &Agent, input: &str) -> BackendResult<String> {
        let mut contents = vec![Content::user_text(input)];

        for round in 0..MAX_TOOL_ROUNDS {
            let request = GenerateContentRequest::for_agent(agent, contents.clone());
            let response = self.client.generate(&agent.model, &request).await?;
            let content = response.into_first_content().ok_or_else(|| {
                BackendError::Malformed("response contained no candidates".to_string())
            })?;

            let Some(call) = content.function_call().cloned() else {
                return Ok(content.rendered_text());
            };

            let Some(tool) = agent.tool(&call.name) else {
                return Err(BackendError::Tool {
                    name: call.name,
                    message: "model requested a tool this agent does not carry".to_string(),
                });
            };

            debug!(agent = %agent.name, tool = %call.name, round, "invoking tool");
            let result = tool.invoke(&call.args).await.map_err(|e| BackendError::Tool {
                name: call.name.clone(),
                message: e.to_string(),
            })?;

            contents.push(content);
            contents.push(Content::function_response(call.name, result));
        }

        Err(BackendError::ToolRounds(MAX_TOOL_ROUNDS))
    }
}
