//! The conversational agent: retrieval, optional web search, completion,
//! and durable turn history.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use campus_core::config::CampusConfig;
use campus_core::types::{SessionId, Turn};
use campus_storage::{HistoryRepository, KnowledgeHit};

use crate::error::AgentError;
use crate::knowledge::KnowledgeSource;
use crate::model::ChatModel;
use crate::prompt::PromptBuilder;
use crate::web_search::{WebResult, WebSearch};

/// Words that signal the user wants current information the knowledge base
/// is unlikely to hold.
const FRESHNESS_KEYWORDS: &[&str] = &[
    "latest", "recent", "news", "today", "upcoming", "event", "events", "ranking",
    "rankings", "rank", "nirf", "press", "announcement", "announcements", "placement",
    "placements", "statistics", "stats", "collaboration", "collaborations",
];

/// Opaque capability the HTTP layer talks to.
///
/// `run` may take as long as the underlying provider calls take; callers
/// await it without a timeout of their own.
#[async_trait]
pub trait ConversationalAgent: Send + Sync {
    /// Answer `message` in the context of `session_id` and record the turn.
    async fn run(&self, message: &str, session_id: &SessionId) -> Result<String, AgentError>;

    /// The session transcript in submission order.
    async fn history(&self, session_id: &SessionId) -> Result<Vec<Turn>, AgentError>;

    /// Forget the session transcript.
    async fn clear_history(&self, session_id: &SessionId) -> Result<(), AgentError>;
}

/// Tunables for [`UniversityAgent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub history_turns: usize,
    pub knowledge_results: u32,
    /// Fewer knowledge hits than this triggers a web search.
    pub min_knowledge_hits: usize,
}

impl AgentSettings {
    pub fn from_config(config: &CampusConfig) -> Self {
        Self {
            history_turns: config.agent.history_turns,
            knowledge_results: config.knowledge.max_results,
            min_knowledge_hits: config.knowledge.min_hits,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&CampusConfig::default())
    }
}

/// Whether the question asks for recent information.
pub fn wants_fresh_information(message: &str) -> bool {
    message
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .any(|w| FRESHNESS_KEYWORDS.contains(&w.as_str()))
}

/// Agent answering prospective-student questions for one university.
pub struct UniversityAgent {
    knowledge: Arc<dyn KnowledgeSource>,
    web: Option<Arc<dyn WebSearch>>,
    model: Arc<dyn ChatModel>,
    history: HistoryRepository,
    prompt: PromptBuilder,
    settings: AgentSettings,
}

impl UniversityAgent {
    pub fn new(
        knowledge: Arc<dyn KnowledgeSource>,
        web: Option<Arc<dyn WebSearch>>,
        model: Arc<dyn ChatModel>,
        history: HistoryRepository,
        prompt: PromptBuilder,
        settings: AgentSettings,
    ) -> Self {
        Self {
            knowledge,
            web,
            model,
            history,
            prompt,
            settings,
        }
    }

    /// Consult the web when the knowledge base is thin or the question is
    /// about recent events.
    fn needs_web(&self, message: &str, hits: &[KnowledgeHit]) -> bool {
        hits.len() < self.settings.min_knowledge_hits || wants_fresh_information(message)
    }
}

#[async_trait]
impl ConversationalAgent for UniversityAgent {
    async fn run(&self, message: &str, session_id: &SessionId) -> Result<String, AgentError> {
        let started = Instant::now();

        let history = self
            .history
            .recent(session_id, self.settings.history_turns)?;
        let hits = self
            .knowledge
            .lookup(message, self.settings.knowledge_results)?;

        let web_results: Vec<WebResult> = match &self.web {
            Some(web) if self.needs_web(message, &hits) => web.search(message).await?,
            _ => Vec::new(),
        };

        debug!(
            session_id = %session_id,
            history_turns = history.len(),
            knowledge_hits = hits.len(),
            web_results = web_results.len(),
            "Context gathered"
        );

        let messages = self.prompt.build(&history, &hits, &web_results, message);
        let reply = self.model.complete(&messages).await?;

        self.history.append_exchange(session_id, message, &reply)?;

        info!(
            session_id = %session_id,
            knowledge_hits = hits.len(),
            web_results = web_results.len(),
            reply_len = reply.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );
        Ok(reply)
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Turn>, AgentError> {
        Ok(self
            .history
            .list(session_id)?
            .into_iter()
            .map(Turn::from)
            .collect())
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), AgentError> {
        let removed = self.history.clear(session_id)?;
        debug!(session_id = %session_id, removed, "Session history cleared");
        Ok(())
    }
}
