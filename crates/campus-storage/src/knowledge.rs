//! Repository for knowledge base chunks.

use std::sync::Arc;

use campus_core::error::CampusError;

use crate::db::Database;

/// Stores chunked source documents. The FTS index is kept in sync by
/// triggers, so writers only touch `knowledge_chunks`.
#[derive(Debug, Clone)]
pub struct KnowledgeRepository {
    db: Arc<Database>,
}

impl KnowledgeRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Whether any chunk from `source` is already stored.
    pub fn source_exists(&self, source: &str) -> Result<bool, CampusError> {
        self.db.with_conn(|conn| {
            let exists: i64 = conn
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM knowledge_chunks WHERE source = ?1)",
                    rusqlite::params![source],
                    |row| row.get(0),
                )
                .map_err(|e| CampusError::Storage(e.to_string()))?;
            Ok(exists != 0)
        })
    }

    /// Replace every chunk of `source` with `chunks`, atomically.
    ///
    /// Returns the number of chunks written.
    pub fn replace_source(&self, source: &str, chunks: &[String]) -> Result<usize, CampusError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| CampusError::Storage(e.to_string()))?;

            tx.execute(
                "DELETE FROM knowledge_chunks WHERE source = ?1",
                rusqlite::params![source],
            )
            .map_err(|e| CampusError::Storage(format!("Failed to remove old chunks: {}", e)))?;

            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO knowledge_chunks (source, chunk_index, content)
                         VALUES (?1, ?2, ?3)",
                    )
                    .map_err(|e| CampusError::Storage(e.to_string()))?;
                for (i, chunk) in chunks.iter().enumerate() {
                    stmt.execute(rusqlite::params![source, i as i64, chunk])
                        .map_err(|e| {
                            CampusError::Storage(format!("Failed to save chunk: {}", e))
                        })?;
                }
            }

            tx.commit()
                .map_err(|e| CampusError::Storage(format!("Failed to commit chunks: {}", e)))?;
            Ok(chunks.len())
        })
    }

    /// Distinct sources currently stored.
    #[cfg(test)]
    pub(crate) fn sources(&self) -> Result<Vec<String>, CampusError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT DISTINCT source FROM knowledge_chunks ORDER BY source")
                .map_err(|e| CampusError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| CampusError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| CampusError::Storage(e.to_string()))
        })
    }

    /// Total number of stored chunks.
    pub fn count(&self) -> Result<u64, CampusError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM knowledge_chunks", [], |row| row.get(0))
                .map_err(|e| CampusError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo() -> KnowledgeRepository {
        KnowledgeRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_replace_source_inserts_chunks() {
        let repo = make_repo();
        let written = repo
            .replace_source("admissions.md", &["one".to_string(), "two".to_string()])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(repo.count().unwrap(), 2);
        assert!(repo.source_exists("admissions.md").unwrap());
        assert!(!repo.source_exists("fees.md").unwrap());
    }

    #[test]
    fn test_replace_source_overwrites_previous_chunks() {
        let repo = make_repo();
        repo.replace_source("fees.md", &["a".into(), "b".into(), "c".into()])
            .unwrap();
        repo.replace_source("fees.md", &["d".into()]).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_sources_listing() {
        let repo = make_repo();
        repo.replace_source("b.md", &["x".into()]).unwrap();
        repo.replace_source("a.md", &["y".into()]).unwrap();
        assert_eq!(repo.sources().unwrap(), vec!["a.md", "b.md"]);
    }
}
