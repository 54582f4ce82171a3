//! Campus Storage crate - SQLite persistence for conversation history and
//! the knowledge base.
//!
//! Provides a WAL-mode SQLite database with migrations, the per-session
//! turn history repository, the knowledge chunk repository with FTS5
//! keyword search, and the loader that populates it from local documents.

pub mod db;
pub mod history;
pub mod knowledge;
pub mod loader;
pub mod migrations;
pub mod search;

pub use db::Database;
pub use history::HistoryRepository;
pub use knowledge::KnowledgeRepository;
pub use loader::{DocumentLoader, LoadReport};
pub use search::{sanitize_fts5_query, KnowledgeHit, KnowledgeSearch};
