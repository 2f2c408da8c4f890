//! Gemini HTTP client with retry/backoff.
//!
//! One call wraps `POST /v1beta/models/{model}:generateContent`. The retry
//! policy lives here because the hosted API is the only collaborator this
//! service talks to; everything above it sees a single attempt.

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::Agent;
use super::error::{BackendError, BackendResult};

/// Cap on error-body text carried into error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// Retry policy for backend calls: maximum attempts, exponential backoff
/// bounded by a maximum delay, and the set of retryable status codes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub exp_base: f64,
    pub max_delay: Duration,
    pub retryable_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_delay: Duration::from_secs(1),
            exp_base: 2.0,
            max_delay: Duration::from_secs(30),
            retryable_status: vec![429, 500, 503, 504],
        }
    }
}

impl From<&crate::settings::RetryConfig> for RetryPolicy {
    fn from(config: &crate::settings::RetryConfig) -> Self {
        Self {
            attempts: config.attempts,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            exp_base: config.exp_base,
            max_delay: Duration::from_millis(config.max_delay_ms),
            retryable_status: config.retryable_status.clone(),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_status.contains(&status)
    }

    /// Deterministic backoff before retry number `retry` (1-based):
    /// `initial_delay * exp_base^(retry - 1)`, capped at `max_delay`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.exp_base.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Backoff with jitter in [0.5, 1.0] of the base delay, so concurrent
    /// sessions retrying the same outage do not stampede in lockstep.
    fn jittered_delay(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        base.mul_f64(rand::rng().random_range(0.5..=1.0))
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// One conversational turn. Role is `user` or `model`; function responses
/// ride in a `user` turn per the API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    pub fn function_response(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: None,
                function_call: None,
                function_response: Some(FunctionResponse {
                    name: name.into(),
                    response: json!({ "result": result.into() }),
                }),
            }],
        }
    }

    /// First function call in this turn, if the model requested one.
    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.parts.iter().find_map(|p| p.function_call.as_ref())
    }

    /// Concatenated text parts of this turn.
    pub fn rendered_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    #[serde(rename = "system_instruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDecl>,
}

impl GenerateContentRequest {
    /// Assemble the request for one agent turn. User input only ever lands
    /// in user-role content, never inside the system instruction.
    pub fn for_agent(agent: &Agent, contents: Vec<Content>) -> Self {
        let mut tools = Vec::new();
        if agent.builtin_search {
            tools.push(ToolDecl::google_search());
        }
        if !agent.tools.is_empty() {
            tools.push(ToolDecl::functions(
                agent
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration::for_tool(t.name(), t.description()))
                    .collect(),
            ));
        }

        Self {
            system_instruction: Some(Content::instruction(agent.instruction.clone())),
            contents,
            tools,
        }
    }
}

/// One entry of the request's `tools` list: either the built-in search
/// capability or a batch of callable function declarations.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDecl {
    #[serde(rename = "google_search", skip_serializing_if = "Option::is_none")]
    google_search: Option<Value>,
    #[serde(rename = "function_declarations", skip_serializing_if = "Option::is_none")]
    function_declarations: Option<Vec<FunctionDeclaration>>,
}

impl ToolDecl {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(json!({})),
            function_declarations: None,
        }
    }

    pub fn functions(declarations: Vec<FunctionDeclaration>) -> Self {
        Self {
            google_search: None,
            function_declarations: Some(declarations),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDeclaration {
    /// Every tool takes a single `request` string argument.
    pub fn for_tool(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": "The request to forward to this tool."
                    }
                },
                "required": ["request"]
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub fn into_first_content(self) -> Option<Content> {
        self.candidates.into_iter().next().and_then(|c| c.content)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the Gemini generateContent API.
///
/// Cheap to clone; safe for concurrent use from many sessions.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

enum AttemptFailure {
    Transport(String),
    Status(u16, String),
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            retry,
        }
    }

    /// Execute one generateContent call, retrying transient failures per the
    /// policy. Non-retryable statuses fail immediately.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> BackendResult<GenerateContentResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        let mut last_failure: Option<AttemptFailure> = None;

        for attempt in 0..self.retry.attempts {
            if attempt > 0 {
                let delay = self.retry.jittered_delay(attempt);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    model,
                    "retrying backend call"
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(request)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(|e| {
                            BackendError::Malformed(format!("invalid response body: {e}"))
                        });
                    }

                    let body = truncate(&response.text().await.unwrap_or_default());
                    if self.retry.is_retryable(status.as_u16()) {
                        warn!(status = status.as_u16(), attempt, model, "retryable backend status");
                        last_failure = Some(AttemptFailure::Status(status.as_u16(), body));
                        continue;
                    }

                    return Err(BackendError::Rejected {
                        status: status.as_u16(),
                        message: body,
                    });
                }
                Err(e) => {
                    warn!(attempt, model, error = %e, "backend request failed");
                    last_failure = Some(AttemptFailure::Transport(e.to_string()));
                }
            }
        }

        Err(match last_failure {
            Some(AttemptFailure::Transport(message)) => BackendError::Unreachable(message),
            Some(AttemptFailure::Status(status, message)) => BackendError::Exhausted {
                attempts: self.retry.attempts,
                message: format!("last status {status}: {message}"),
            },
            // attempts >= 1 is validated at startup
            None => BackendError::Exhausted {
                attempts: self.retry.attempts,
                message: "no attempt was made".to_string(),
            },
        })
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        body.to_string()
    } else {
        let mut end = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
