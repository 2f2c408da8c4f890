//! Answer-generation error taxonomy.

use thiserror::Error;

use crate::agent::BackendError;

/// Errors an answer generator can surface to the connection handler. Both
/// are per-message failures: the session stays open and an error frame is
/// sent to the client.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The backend is unreachable or misconfigured.
    #[error("answer backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend ran but failed, after exhausting its internal retries.
    #[error("answer generation failed: {0}")]
    GenerationFailed(String),
}

impl GeneratorError {
    /// Stable wire category for error frames.
    pub fn category(&self) -> &'static str {
        match self {
            GeneratorError::BackendUnavailable(_) => "backend_unavailable",
            GeneratorError::GenerationFailed(_) => "generation_failed",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            GeneratorError::BackendUnavailable(detail)
            | GeneratorError::GenerationFailed(detail) => detail,
        }
    }
}

impl From<BackendError> for GeneratorError {
    fn from(err: BackendError) -> Self {
        if err.is_unavailable() {
            GeneratorError::BackendUnavailable(err.to_string())
        } else {
            GeneratorError::GenerationFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_classification() {
        let unavailable: GeneratorError = BackendError::Unreachable("refused".into()).into();
        assert!(matches!(unavailable, GeneratorError::BackendUnavailable(_)));
        assert_eq!(unavailable.category(), "backend_unavailable");

        let failed: GeneratorError = BackendError::Exhausted {
            attempts: 5,
            message: "rate limited".into(),
        }
        .into();
        assert!(matches!(failed, GeneratorError::GenerationFailed(_)));
        assert_eq!(failed.category(), "generation_failed");
    }
}
