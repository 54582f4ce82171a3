//! Keyword search over the knowledge base using SQLite FTS5.
//!
//! Free-form questions are reduced to a disjunction of quoted terms and
//! ranked by BM25.

use std::collections::HashSet;
use std::sync::Arc;

use campus_core::error::CampusError;

use crate::db::Database;

/// Words that carry no retrieval signal in a question.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "do", "does",
    "for", "from", "give", "have", "hi", "hello", "how", "i", "in", "is", "it", "me", "my",
    "of", "on", "or", "please", "tell", "that", "the", "there", "this", "to", "was", "what",
    "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

/// A single knowledge chunk matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeHit {
    pub source: String,
    pub chunk_index: i64,
    pub content: String,
    /// BM25 relevance (higher = more relevant).
    pub score: f64,
}

/// Turn free text into a safe FTS5 MATCH expression.
///
/// Splits on anything that is not alphanumeric, drops stopwords and
/// single characters, de-duplicates case-insensitively, quotes each term
/// and joins them with `OR`. Returns `None` when nothing searchable is left.
pub fn sanitize_fts5_query(text: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .map(|t| format!("\"{}\"", t))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// Full-text search engine over `knowledge_fts`.
#[derive(Debug, Clone)]
pub struct KnowledgeSearch {
    db: Arc<Database>,
}

impl KnowledgeSearch {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Search the knowledge base with a natural-language question.
    pub fn search(&self, question: &str, limit: u32) -> Result<Vec<KnowledgeHit>, CampusError> {
        match sanitize_fts5_query(question) {
            Some(expr) => self.search_raw(&expr, limit),
            None => Ok(Vec::new()),
        }
    }

    /// Search with an FTS5 query expression, as given.
    pub fn search_raw(&self, expr: &str, limit: u32) -> Result<Vec<KnowledgeHit>, CampusError> {
        if expr.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT c.source, c.chunk_index, c.content, bm25(knowledge_fts) AS rank
                     FROM knowledge_fts
                     JOIN knowledge_chunks c ON c.id = knowledge_fts.rowid
                     WHERE knowledge_fts MATCH ?1
                     ORDER BY rank
                     LIMIT ?2",
                )
                .map_err(|e| CampusError::Storage(format!("FTS5 query prepare failed: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![expr, limit], |row| {
                    let rank: f64 = row.get(3)?;
                    Ok(KnowledgeHit {
                        source: row.get(0)?,
                        chunk_index: row.get(1)?,
                        content: row.get(2)?,
                        // bm25() is negative (lower = better), negate for consistency.
                        score: -rank,
                    })
                })
                .map_err(|e| CampusError::Storage(format!("FTS5 query failed: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| CampusError::Storage(e.to_string()))
        })
    }
}
