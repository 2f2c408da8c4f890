//! Backend client error types.

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while driving the generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the backend at all, even after retrying.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// The backend rejected the request with a non-retryable status.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Retryable failures persisted past the attempt limit.
    #[error("backend failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    /// The response body did not contain a usable candidate.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// A tool invocation inside the agent loop failed.
    #[error("tool '{name}' failed: {message}")]
    Tool { name: String, message: String },

    /// The model kept requesting tool calls past the round limit.
    #[error("tool-call rounds exceeded limit of {0}")]
    ToolRounds(usize),
}

impl BackendError {
    /// Whether this error means the backend is unreachable or misconfigured,
    /// as opposed to a generation that ran and failed.
    pub fn is_unavailable(&self) -> bool {
        match self {
            BackendError::Unreachable(_) => true,
            // Credential and endpoint misconfiguration surface as 4xx here.
            BackendError::Rejected { status, .. } => {
                matches!(status, 401 | 403 | 404)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(BackendError::Unreachable("refused".into()).is_unavailable());
        assert!(
            BackendError::Rejected {
                status: 401,
                message: "bad key".into()
            }
            .is_unavailable()
        );
        assert!(
            !BackendError::Rejected {
                status: 400,
                message: "bad request".into()
            }
            .is_unavailable()
        );
        assert!(
            !BackendError::Exhausted {
                attempts: 5,
                message: "rate limited".into()
            }
            .is_unavailable()
        );
    }
}
