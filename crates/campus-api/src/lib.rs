//! Campus API crate - the HTTP façade of the admissions assistant.
//!
//! Serves the chat page, the JSON endpoints for asking questions,
//! resetting a conversation and reading its history, and a health check.
//! Sessions are tracked with an HMAC-signed cookie only.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use session::{ResetOutcome, SessionHandle, SessionTracker};
pub use state::AppState;
