//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use minijinja::Environment;

use campus_agent::ConversationalAgent;
use campus_core::config::CampusConfig;
use campus_core::error::CampusError;
use campus_storage::{Database, KnowledgeRepository};

use crate::session::SessionTracker;
use crate::templates;

/// Shared application state.
///
/// Cloned per request; everything heavy sits behind `Arc`. The façade holds
/// no conversation state of its own: transcripts live in the agent's store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CampusConfig>,
    pub agent: Arc<dyn ConversationalAgent>,
    pub sessions: SessionTracker,
    /// Used only for the health report.
    pub knowledge: KnowledgeRepository,
    pub templates: Arc<Environment<'static>>,
    pub start_time: Instant,
}

impl AppState {
    /// Fails if the session secret is missing or too short.
    pub fn new(
        config: CampusConfig,
        agent: Arc<dyn ConversationalAgent>,
        database: Arc<Database>,
    ) -> Result<Self, CampusError> {
        let sessions = SessionTracker::from_config(&config.session)?;
        let templates = templates::environment()
            .map_err(|e| CampusError::Api(format!("failed to load templates: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            agent,
            sessions,
            knowledge: KnowledgeRepository::new(database),
            templates: Arc::new(templates),
            start_time: Instant::now(),
        })
    }
}
