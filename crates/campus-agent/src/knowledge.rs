//! Knowledge base seam used by the agent.

use campus_storage::{KnowledgeHit, KnowledgeSearch};

use crate::error::AgentError;

/// Something the agent can ask for passages relevant to a question.
pub trait KnowledgeSource: Send + Sync {
    fn lookup(&self, question: &str, limit: u32) -> Result<Vec<KnowledgeHit>, AgentError>;
}

impl KnowledgeSource for KnowledgeSearch {
    fn lookup(&self, question: &str, limit: u32) -> Result<Vec<KnowledgeHit>, AgentError> {
        self.search(question, limit)
            .map_err(|e| AgentError::Knowledge(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use campus_storage::{Database, KnowledgeRepository};

    #[test]
    fn test_knowledge_search_as_source() {
        let db = Arc::new(Database::in_memory().unwrap());
        KnowledgeRepository::new(Arc::clone(&db))
            .replace_source("scholarships.md", &["Merit scholarships up to 50%".to_string()])
            .unwrap();

        let source: Box<dyn KnowledgeSource> = Box::new(KnowledgeSearch::new(db));
        let hits = source.lookup("merit scholarships", 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "scholarships.md");
    }
}
