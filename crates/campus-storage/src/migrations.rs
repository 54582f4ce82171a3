//! Database schema migrations.
//!
//! Applies the initial schema: conversation_turns, knowledge_chunks, the
//! knowledge_fts index with its sync triggers, and schema_migrations.

use rusqlite::Connection;
use tracing::info;

use campus_core::error::CampusError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), CampusError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CampusError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| CampusError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), CampusError> {
    conn.execute_batch(
        "
        -- One row per message, ordered by seq within a session.
        CREATE TABLE IF NOT EXISTS conversation_turns (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  TEXT NOT NULL,
            seq         INTEGER NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (session_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_turns_session
            ON conversation_turns (session_id, seq);

        -- Source documents split into overlapping chunks.
        CREATE TABLE IF NOT EXISTS knowledge_chunks (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            source       TEXT NOT NULL,
            chunk_index  INTEGER NOT NULL,
            content      TEXT NOT NULL,
            created_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (source, chunk_index)
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS knowledge_fts USING fts5(
            content,
            source UNINDEXED,
            content = 'knowledge_chunks',
            content_rowid = 'id',
            tokenize = 'porter unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS knowledge_chunks_ai AFTER INSERT ON knowledge_chunks BEGIN
            INSERT INTO knowledge_fts (rowid, content, source)
            VALUES (new.id, new.content, new.source);
        END;

        CREATE TRIGGER IF NOT EXISTS knowledge_chunks_ad AFTER DELETE ON knowledge_chunks BEGIN
            INSERT INTO knowledge_fts (knowledge_fts, rowid, content, source)
            VALUES ('delete', old.id, old.content, old.source);
        END;

        CREATE TRIGGER IF NOT EXISTS knowledge_chunks_au AFTER UPDATE ON knowledge_chunks BEGIN
            INSERT INTO knowledge_fts (knowledge_fts, rowid, content, source)
            VALUES ('delete', old.id, old.content, old.source);
            INSERT INTO knowledge_fts (rowid, content, source)
            VALUES (new.id, new.content, new.source);
        END;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| CampusError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO conversation_turns (session_id, seq, role, content)
             VALUES ('s', 1, 'system', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_fts_triggers_follow_chunk_table() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO knowledge_chunks (source, chunk_index, content)
             VALUES ('fees.md', 0, 'hostel fees are payable per semester')",
            [],
        )
        .unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM knowledge_fts WHERE knowledge_fts MATCH 'hostel'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);

        conn.execute("DELETE FROM knowledge_chunks", []).unwrap();
        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM knowledge_fts WHERE knowledge_fts MATCH 'hostel'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hits, 0);
    }
}
