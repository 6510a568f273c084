//! SQLite-backed conversation storage.
//!
//! A single [`Database`] handle owns the connection and the schema; the
//! conversation store, the user registry, and the API-key store all share it.
//! The connection is guarded by a mutex held only across synchronous
//! statements, never across an await point.

use crate::error::Result;
use crate::message::{ChatMessage, HistoryMessage, TokenUsage};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to the embedded datastore.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Arc<Self>> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Arc<Self>> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Arc<Self>> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                is_bot INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                prompt_tokens INTEGER,
                completion_tokens INTEGER,
                total_tokens INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                ON chat_messages(session_id, user_id, created_at);

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT
            );

            CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT PRIMARY KEY,
                role TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS api_keys (
                service TEXT PRIMARY KEY,
                key TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
        }))
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        Ok(f(&conn)?)
    }
}

/// A message about to be inserted; id and timestamp are assigned here.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub user_id: String,
    pub content: String,
    pub is_bot: bool,
    pub usage: Option<TokenUsage>,
}

/// Read/write access to chat message rows, always scoped by user.
#[derive(Clone)]
pub struct ConversationStore {
    db: Arc<Database>,
}

impl ConversationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn insert_message(&self, msg: NewMessage) -> Result<ChatMessage> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages
                 (id, session_id, user_id, content, is_bot, created_at,
                  prompt_tokens, completion_tokens, total_tokens)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    msg.session_id,
                    msg.user_id,
                    msg.content,
                    msg.is_bot,
                    created_at.to_rfc3339(),
                    msg.usage.map(|u| u.prompt_tokens),
                    msg.usage.map(|u| u.completion_tokens),
                    msg.usage.map(|u| u.total_tokens),
                ],
            )?;
            Ok(())
        })?;
        Ok(ChatMessage {
            id,
            session_id: msg.session_id,
            user_id: msg.user_id,
            content: msg.content,
            is_bot: msg.is_bot,
            created_at,
            usage: msg.usage,
        })
    }

    /// Number of messages already stored for a session, any user.
    pub fn session_message_count(&self, session_id: &str) -> Result<usize> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
                params![session_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
        })
    }

    /// All messages for a session owned by `user_id`, oldest first.
    pub fn session_messages(&self, session_id: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, user_id, content, is_bot, created_at,
                        prompt_tokens, completion_tokens, total_tokens
                 FROM chat_messages
                 WHERE session_id = ?1 AND user_id = ?2
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![session_id, user_id], row_to_message)?;
            rows.collect()
        })
    }

    /// Last `limit` messages for a session in vendor role vocabulary,
    /// oldest first.
    pub fn recent_history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryMessage>> {
        let mut history = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT content, is_bot FROM chat_messages
                 WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![session_id, limit as i64], |row| {
                let content: String = row.get(0)?;
                let is_bot: bool = row.get(1)?;
                Ok(HistoryMessage::from_row(content, is_bot))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        history.reverse();
        Ok(history)
    }

    /// Delete one message. Deleting an absent row is not an error.
    pub fn delete_message(&self, message_id: Uuid, user_id: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_messages WHERE id = ?1 AND user_id = ?2",
                params![message_id.to_string(), user_id],
            )?;
            Ok(())
        })
    }

    /// Delete all messages of one session owned by `user_id`. Idempotent.
    pub fn delete_session(&self, session_id: &str, user_id: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_messages WHERE session_id = ?1 AND user_id = ?2",
                params![session_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Delete every message owned by `user_id` across all sessions.
    pub fn delete_chat_history(&self, user_id: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_messages WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(5)?;
    let prompt_tokens: Option<u32> = row.get(6)?;
    let usage = prompt_tokens.map(|p| TokenUsage {
        prompt_tokens: p,
        completion_tokens: row.get::<_, Option<u32>>(7).ok().flatten().unwrap_or(0),
        total_tokens: row.get::<_, Option<u32>>(8).ok().flatten().unwrap_or(0),
    });
    Ok(ChatMessage {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        is_bot: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?
            .with_timezone(&Utc),
        usage,
    })
}
