//! Answer-generation abstraction.
//!
//! Maps a query string to an answer string, hiding whatever agent pipeline
//! is configured behind it. One generator instance is built at startup and
//! shared read-only across all sessions.

mod error;
mod pipeline;
mod single;

pub use error::GeneratorError;
pub use pipeline::ResearchPipeline;
pub use single::SingleStage;

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::GeminiClient;
use crate::settings::{GeneratorConfig, GeneratorStrategy};

/// A generated answer. Only the rendered text survives to the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    text: String,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character count of the rendered answer (Unicode scalar values).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Given an input query, produce an answer.
///
/// An empty query is a defined input: the generator is still invoked.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str) -> Result<Answer, GeneratorError>;
}

/// Build the configured strategy.
pub fn build(config: &GeneratorConfig, client: GeminiClient) -> Arc<dyn AnswerGenerator> {
    match config.strategy {
        GeneratorStrategy::Single => Arc::new(SingleStage::new(config, client)),
        GeneratorStrategy::Pipeline => Arc::new(ResearchPipeline::new(config, client)),
    }
}
