//! Per-session conversation history.
//!
//! This table is the single source of truth for transcripts: the HTTP layer
//! holds nothing but the session identifier.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;

use campus_core::error::CampusError;
use campus_core::types::{Role, SessionId, StoredTurn};

use crate::db::Database;

/// Repository for conversation turns keyed by session.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: Arc<Database>,
}

impl HistoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a user question and the assistant reply as one unit.
    ///
    /// Both rows land or neither does, so a transcript never ends with an
    /// unanswered question from a completed exchange.
    pub fn append_exchange(
        &self,
        session: &SessionId,
        question: &str,
        answer: &str,
    ) -> Result<(), CampusError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| CampusError::Storage(e.to_string()))?;
            let seq = next_seq(&tx, session)?;
            insert_turn(&tx, session, seq, Role::User, question)?;
            insert_turn(&tx, session, seq + 1, Role::Assistant, answer)?;
            tx.commit()
                .map_err(|e| CampusError::Storage(format!("Failed to commit exchange: {}", e)))
        })
    }

    /// All turns of the session in submission order.
    pub fn list(&self, session: &SessionId) -> Result<Vec<StoredTurn>, CampusError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, seq, role, content, created_at
                     FROM conversation_turns
                     WHERE session_id = ?1
                     ORDER BY seq ASC",
                )
                .map_err(|e| CampusError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session.to_string()], row_to_parts)
                .map_err(|e| CampusError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let parts = row.map_err(|e| CampusError::Storage(e.to_string()))?;
                turns.push(parts_to_turn(parts)?);
            }
            Ok(turns)
        })
    }

    /// The last `limit` turns of the session, oldest first.
    pub fn recent(&self, session: &SessionId, limit: usize) -> Result<Vec<StoredTurn>, CampusError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, seq, role, content, created_at
                     FROM conversation_turns
                     WHERE session_id = ?1
                     ORDER BY seq DESC
                     LIMIT ?2",
                )
                .map_err(|e| CampusError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![session.to_string(), limit as i64],
                    row_to_parts,
                )
                .map_err(|e| CampusError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let parts = row.map_err(|e| CampusError::Storage(e.to_string()))?;
                turns.push(parts_to_turn(parts)?);
            }
            turns.reverse();
            Ok(turns)
        })
    }

    /// Delete every turn of the session. Returns the number of rows removed.
    pub fn clear(&self, session: &SessionId) -> Result<u64, CampusError> {
        self.db.with_conn(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM conversation_turns WHERE session_id = ?1",
                    rusqlite::params![session.to_string()],
                )
                .map_err(|e| CampusError::Storage(format!("Failed to clear history: {}", e)))?;
            Ok(removed as u64)
        })
    }
}

type TurnParts = (String, i64, String, String, i64);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<TurnParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parts_to_turn(parts: TurnParts) -> Result<StoredTurn, CampusError> {
    let (session_id, seq, role, content, created_at) = parts;
    let session_id = session_id
        .parse::<SessionId>()
        .map_err(|e| CampusError::Storage(format!("Invalid session id: {}", e)))?;
    let role = role.parse::<Role>().map_err(CampusError::Storage)?;
    let created_at = Utc
        .timestamp_opt(created_at, 0)
        .single()
        .unwrap_or_default();

    Ok(StoredTurn {
        session_id,
        seq,
        role,
        content,
        created_at,
    })
}

fn next_seq(conn: &Connection, session: &SessionId) -> Result<i64, CampusError> {
    let max: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM conversation_turns WHERE session_id = ?1",
            rusqlite::params![session.to_string()],
            |row| row.get(0),
        )
        .map_err(|e| CampusError::Storage(e.to_string()))?;
    Ok(max + 1)
}

fn insert_turn(
    conn: &Connection,
    session: &SessionId,
    seq: i64,
    role: Role,
    content: &str,
) -> Result<(), CampusError> {
    conn.execute(
        "INSERT INTO conversation_turns (session_id, seq, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            session.to_string(),
            seq,
            role.as_str(),
            content,
            Utc::now().timestamp(),
        ],
    )
    .map_err(|e| CampusError::Storage(format!("Failed to save turn: {}", e)))?;
    Ok(())
}
