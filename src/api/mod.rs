//! HTTP API module.
//!
//! Provides the WebSocket relay endpoint, a one-shot chat endpoint, and a
//! health probe.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{ChatRequest, ChatResponse, HealthResponse};
pub use routes::create_router;
pub use state::AppState;
