//! Application state shared across handlers.

use std::sync::Arc;

use crate::generator::AnswerGenerator;
use crate::ws::SessionRegistry;

/// Application state shared across all handlers.
///
/// The generator is constructed once and shared read-only by every session;
/// construction cost is never paid per request.
#[derive(Clone)]
pub struct AppState {
    /// The configured answer-generation strategy.
    pub generator: Arc<dyn AnswerGenerator>,
    /// Registry of open relay sessions.
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Create new application state.
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            generator,
            registry: Arc::new(SessionRegistry::new()),
        }
    }
}
