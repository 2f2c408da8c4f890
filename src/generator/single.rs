//! Single-stage strategy: one agent answers directly.

use async_trait::async_trait;

use crate::agent::{Agent, GeminiClient, Runner};
use crate::settings::GeneratorConfig;

use super::error::GeneratorError;
use super::{Answer, AnswerGenerator};

/// One generation step with an optional search capability attached.
pub struct SingleStage {
    agent: Agent,
    runner: Runner,
}

impl SingleStage {
    pub fn new(config: &GeneratorConfig, client: GeminiClient) -> Self {
        let mut agent = Agent::new(
            "assistant",
            config.model.clone(),
            config.instruction.clone(),
        );
        if config.search {
            agent = agent.with_search();
        }

        Self {
            agent,
            runner: Runner::new(client),
        }
    }
}

#[async_trait]
impl AnswerGenerator for SingleStage {
    async fn generate(&self, query: &str) -> Result<Answer, GeneratorError> {
        let text = self.runner.run(&self.agent, query).await?;
        Ok(Answer::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RetryPolicy;
    use std::time::Duration;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "http://127.0.0.1:1",
            "test-key",
            RetryPolicy::default(),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_search_flag_follows_config() {
        let mut config = GeneratorConfig::default();
        config.search = true;
        assert!(SingleStage::new(&config, client()).agent.builtin_search);

        config.search = false;
        assert!(!SingleStage::new(&config, client()).agent.builtin_search);
    }

    #[test]
    fn test_instruction_comes_from_config_not_query() {
        let mut config = GeneratorConfig::default();
        config.instruction = "Be terse.".to_string();
        let stage = SingleStage::new(&config, client());
        assert_eq!(stage.agent.instruction, "Be terse.");
    }
}
