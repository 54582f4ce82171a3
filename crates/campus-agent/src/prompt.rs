//! Prompt assembly: persona, retrieved context, history and the question.

use std::path::Path;

use campus_core::config::AgentConfig;
use campus_core::types::{Role, StoredTurn};
use campus_storage::KnowledgeHit;

use crate::error::AgentError;
use crate::model::ChatMessage;
use crate::web_search::WebResult;

/// Built-in assistant instructions. `{{name}}` and `{{university}}` are
/// substituted from [`AgentConfig`].
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("../assets/instructions.md");

/// Builds the message list sent to the model for one question.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instructions: String,
}

impl PromptBuilder {
    /// Build from a raw instructions template.
    pub fn new(template: &str, name: &str, university: &str) -> Self {
        let instructions = template
            .replace("{{name}}", name)
            .replace("{{university}}", university)
            .trim()
            .to_string();
        Self { instructions }
    }

    /// Build from agent configuration, reading `instructions_path` if set.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let template = match &config.instructions_path {
            Some(path) => std::fs::read_to_string(Path::new(path)).map_err(|e| {
                AgentError::Config(format!("failed to read instructions {}: {}", path, e))
            })?,
            None => DEFAULT_INSTRUCTIONS.to_string(),
        };
        Ok(Self::new(&template, &config.name, &config.university))
    }

    /// The system message: instructions followed by the retrieved context.
    pub fn system_message(&self, knowledge: &[KnowledgeHit], web: &[WebResult]) -> String {
        let mut out = String::with_capacity(self.instructions.len() + 1024);
        out.push_str(&self.instructions);

        out.push_str("\n\n## Knowledge base passages\n");
        if knowledge.is_empty() {
            out.push_str("No matching knowledge base passages were found.\n");
        } else {
            for (i, hit) in knowledge.iter().enumerate() {
                out.push_str(&format!(
                    "[K{}] (source: {})\n{}\n\n",
                    i + 1,
                    hit.source,
                    hit.content
                ));
            }
        }

        if !web.is_empty() {
            out.push_str("\n## Web search results\n");
            for (i, result) in web.iter().enumerate() {
                out.push_str(&format!(
                    "[W{}] {} ({})\n{}\n\n",
                    i + 1,
                    result.title,
                    result.link,
                    result.snippet
                ));
            }
        }

        out.trim_end().to_string()
    }

    /// Full message list: system, prior turns, then the new question.
    pub fn build(
        &self,
        history: &[StoredTurn],
        knowledge: &[KnowledgeHit],
        web: &[WebResult],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_message(knowledge, web)));
        for turn in history {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            });
        }
        messages.push(ChatMessage::user(question));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChatRole;
    use campus_core::types::SessionId;

    fn turn(role: Role, content: &str) -> StoredTurn {
        StoredTurn {
            session_id: SessionId::generate(),
            seq: 1,
            role,
            content: content.to_string(),
            created_at: Default::default(),
        }
    }

    fn hit(source: &str, content: &str) -> KnowledgeHit {
        KnowledgeHit {
            source: source.to_string(),
            chunk_index: 0,
            content: content.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn test_default_instructions_substitution() {
        let builder = PromptBuilder::from_config(&AgentConfig::default()).unwrap();
        assert!(builder.instructions.starts_with("You are Virat"));
        assert!(builder.instructions.contains("C.V. Raman Global University"));
        assert!(!builder.instructions.contains("{{"));
    }

    #[test]
    fn test_instructions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.md");
        std::fs::write(&path, "I am {{name}} of {{university}}.").unwrap();
        let config = AgentConfig {
            name: "Asha".to_string(),
            university: "Example University".to_string(),
            instructions_path: Some(path.to_string_lossy().to_string()),
            history_turns: 2,
        };
        let builder = PromptBuilder::from_config(&config).unwrap();
        assert_eq!(builder.instructions, "I am Asha of Example University.");
    }

    #[test]
    fn test_missing_instructions_file() {
        let config = AgentConfig {
            instructions_path: Some("/nonexistent/persona.md".to_string()),
            ..AgentConfig::default()
        };
        assert!(matches!(
            PromptBuilder::from_config(&config),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_system_message_lists_context() {
        let builder = PromptBuilder::new("Base.", "n", "u");
        let msg = builder.system_message(
            &[hit("fees.md", "B.Tech fee is 1.6L")],
            &[WebResult {
                title: "News".to_string(),
                link: "https://example.org/news".to_string(),
                snippet: "Convocation held".to_string(),
            }],
        );
        assert!(msg.starts_with("Base."));
        assert!(msg.contains("[K1] (source: fees.md)\nB.Tech fee is 1.6L"));
        assert!(msg.contains("[W1] News (https://example.org/news)"));
    }

    #[test]
    fn test_system_message_without_context() {
        let builder = PromptBuilder::new("Base.", "n", "u");
        let msg = builder.system_message(&[], &[]);
        assert!(msg.contains("No matching knowledge base passages"));
        assert!(!msg.contains("Web search results"));
    }

    #[test]
    fn test_build_orders_messages() {
        let builder = PromptBuilder::new("Base.", "n", "u");
        let history = vec![turn(Role::User, "q1"), turn(Role::Assistant, "a1")];
        let messages = builder.build(&history, &[], &[], "q2");
        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(messages.last().unwrap().content, "q2");
    }
}
