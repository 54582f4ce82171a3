//! Error types for the conversational agent.

use campus_core::error::CampusError;

/// Errors from the agent and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("knowledge base error: {0}")]
    Knowledge(String),
    #[error("web search error: {0}")]
    WebSearch(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("history store error: {0}")]
    History(String),
    #[error("agent configuration error: {0}")]
    Config(String),
}

impl From<CampusError> for AgentError {
    fn from(err: CampusError) -> Self {
        match err {
            CampusError::Config(msg) => AgentError::Config(msg),
            CampusError::Knowledge(msg) => AgentError::Knowledge(msg),
            other => AgentError::History(other.to_string()),
        }
    }
}
