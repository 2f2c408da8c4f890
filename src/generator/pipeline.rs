//! Two-stage strategy: research first, then coordinate/summarize.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{Agent, AgentTool, GeminiClient, Runner};
use crate::settings::GeneratorConfig;

use super::error::GeneratorError;
use super::{Answer, AnswerGenerator};

/// A research agent gathers findings; a coordinator agent turns them into
/// the final answer. The research step always completes before the
/// coordinator runs. The coordinator also carries the research agent as a
/// callable tool for follow-up lookups.
pub struct ResearchPipeline {
    research: Agent,
    coordinator: Agent,
    runner: Runner,
}

impl ResearchPipeline {
    pub fn new(config: &GeneratorConfig, client: GeminiClient) -> Self {
        let runner = Runner::new(client);

        let mut research = Agent::new(
            "researcher",
            config.research_model().to_string(),
            config.research_instruction.clone(),
        );
        if config.search {
            research = research.with_search();
        }

        let coordinator = Agent::new(
            "coordinator",
            config.model.clone(),
            config.summarize_instruction.clone(),
        )
        .with_tool(Arc::new(AgentTool::new(
            research.clone(),
            runner.clone(),
            "Delegate a follow-up research request and return its findings.",
        )));

        Self {
            research,
            coordinator,
            runner,
        }
    }
}

#[async_trait]
impl AnswerGenerator for ResearchPipeline {
    async fn generate(&self, query: &str) -> Result<Answer, GeneratorError> {
        let findings = self.runner.run(&self.research, query).await?;

        // Findings and the original question ride in user-role content;
        // instructions stay fixed and never absorb user input.
        let brief = format!("Question:\n{query}\n\nResearch findings:\n{findings}");
        let text = self.runner.run(&self.coordinator, &brief).await?;
        Ok(Answer::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RetryPolicy;
    use crate::settings::GeneratorStrategy;

    use std::sync::Mutex;
    use std::time::Duration;

    use axum::{Json, Router, extract::State, routing::post};
    use serde_json::Value;

    /// Stub backend that records every request body and answers from a
    /// canned sequence.
    async fn recording_backend(
        responses: Vec<Value>,
    ) -> (GeminiClient, Arc<Mutex<Vec<Value>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let state = (Arc::new(responses), bodies.clone());

        let app = Router::new()
            .route(
                "/v1beta/models/{call}",
                post(
                    |State((responses, bodies)): State<(
                        Arc<Vec<Value>>,
                        Arc<Mutex<Vec<Value>>>,
                    )>,
                     Json(body): Json<Value>| async move {
                        let mut seen = bodies.lock().unwrap();
                        let index = seen.len();
                        seen.push(body);
                        Json(responses[index.min(responses.len() - 1)].clone())
                    },
                ),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GeminiClient::new(
            format!("http://{addr}"),
            "test-key",
            RetryPolicy::default(),
            Duration::from_secs(5),
        );
        (client, bodies)
    }

    fn text_response(text: &str) -> Value {
        serde_json::json!({
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": text } ] } }
            ]
        })
    }

    #[tokio::test]
    async fn test_research_runs_before_coordinator() {
        let (client, bodies) = recording_backend(vec![
            text_response("finding: the sky is blue"),
            text_response("The sky is blue."),
        ])
        .await;

        let mut config = GeneratorConfig::default();
        config.strategy = GeneratorStrategy::Pipeline;
        let pipeline = ResearchPipeline::new(&config, client);

        let answer = pipeline.generate("why is the sky blue?").await.unwrap();
        assert_eq!(answer.text(), "The sky is blue.");

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 2);

        // First call is the research agent: fixed instruction, user query.
        let research_instruction =
            bodies[0]["system_instruction"]["parts"][0]["text"].as_str().unwrap();
        assert_eq!(research_instruction, config.research_instruction);
        assert_eq!(
            bodies[0]["contents"][0]["parts"][0]["text"],
            "why is the sky blue?"
        );

        // Second call sees the findings in user content, never in the
        // instruction.
        let summary_instruction =
            bodies[1]["system_instruction"]["parts"][0]["text"].as_str().unwrap();
        assert_eq!(summary_instruction, config.summarize_instruction);
        assert!(!summary_instruction.contains("sky"));
        let brief = bodies[1]["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(brief.contains("finding: the sky is blue"));
        assert!(brief.contains("why is the sky blue?"));
    }

    #[tokio::test]
    async fn test_coordinator_carries_researcher_as_tool() {
        let (client, bodies) = recording_backend(vec![
            text_response("findings"),
            text_response("answer"),
        ])
        .await;

        let config = GeneratorConfig::default();
        let pipeline = ResearchPipeline::new(&config, client);
        assert!(pipeline.coordinator.tool("researcher").is_some());

        pipeline.generate("q").await.unwrap();

        let bodies = bodies.lock().unwrap();
        let declarations = &bodies[1]["tools"];
        let declared = declarations
            .as_array()
            .unwrap()
            .iter()
            .any(|t| {
                t["function_declarations"]
                    .as_array()
                    .is_some_and(|fns| fns.iter().any(|f| f["name"] == "researcher"))
            });
        assert!(declared);
    }

    #[tokio::test]
    async fn test_research_failure_stops_pipeline() {
        // Point at a closed port: the research call fails, the coordinator
        // never runs.
        let client = GeminiClient::new(
            "http://127.0.0.1:1",
            "test-key",
            RetryPolicy {
                attempts: 1,
                initial_delay: Duration::from_millis(1),
                exp_base: 2.0,
                max_delay: Duration::from_millis(10),
                retryable_status: vec![429],
            },
            Duration::from_millis(500),
        );
        let pipeline = ResearchPipeline::new(&GeneratorConfig::default(), client);

        let err = pipeline.generate("q").await.unwrap_err();
        assert!(matches!(err, GeneratorError::BackendUnavailable(_)));
    }
}
