//! Conversational agent for Campus Guide.
//!
//! Answers a question by searching the knowledge base, falling back to
//! web search when the knowledge base is thin, asking a hosted chat model
//! to compose the reply, and recording the exchange in the session history.

pub mod agent;
pub mod error;
pub mod knowledge;
pub mod model;
pub mod prompt;
pub mod web_search;

pub use agent::{AgentSettings, ConversationalAgent, UniversityAgent};
pub use error::AgentError;
pub use knowledge::KnowledgeSource;
pub use model::{ChatMessage, ChatModel, ChatRole, OpenAiChat};
pub use prompt::PromptBuilder;
pub use web_search::{GoogleSearch, WebResult, WebSearch};
