//! WebSocket relay endpoint.
//!
//! One task per client connection; within a connection, frames are
//! processed strictly in order:
//!
//! ```text
//! client ──frame──▶ resolve_query ──▶ AnswerGenerator ──▶ reply frame
//!    ▲                                                        │
//!    └────────────────────────────────────────────────────────┘
//! ```
//!
//! A disconnect cancels the in-flight generation; per-message errors are
//! sent back as error frames and the session stays open.

mod handler;
mod registry;
mod types;

pub use handler::ws_handler;
pub use registry::{SessionGuard, SessionRegistry};
pub use types::{OutboundFrame, resolve_query};
