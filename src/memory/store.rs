// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SQLite persistence layer - the source of truth.
//!
//! Holds conversation turns, tool execution records, traces, session
//! summaries, the user profile and the external-chat -> session mapping.
//! Writes are serialized through a single async lock; the database runs in
//! WAL mode so readers never block on the writer.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use uuid::Uuid;

use tracing::info;

use crate::agent::types::Trace;
use crate::error::StoreError;

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA foreign_keys=ON;

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    role TEXT NOT NULL CHECK(role IN ('user','assistant','tool')),
    content TEXT NOT NULL,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    tokens_used INTEGER,
    model TEXT
);

CREATE TABLE IF NOT EXISTS tool_executions (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    input_preview TEXT NOT NULL,
    output_preview TEXT,
    safety_tier TEXT,
    user_confirmed BOOLEAN,
    duration_ms INTEGER,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS traces (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    total_duration_ms INTEGER,
    total_input_tokens INTEGER,
    total_output_tokens INTEGER,
    total_cost_usd REAL,
    iterations INTEGER,
    tools_called_json TEXT,
    success BOOLEAN,
    error_message TEXT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS session_summaries (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    summary TEXT NOT NULL,
    generated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS user_profile (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    confidence REAL DEFAULT 1.0,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS chat_sessions (
    chat_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_conversations_session ON conversations(session_id);
CREATE INDEX IF NOT EXISTS idx_conversations_timestamp ON conversations(timestamp);
CREATE INDEX IF NOT EXISTS idx_traces_timestamp ON traces(timestamp);
CREATE INDEX IF NOT EXISTS idx_summaries_session ON session_summaries(session_id, generated_at);
CREATE INDEX IF NOT EXISTS idx_profile_confidence ON user_profile(confidence);
"#;

/// A stored conversation turn, as fed back into the prompt.
#[derive(Debug, Clone)]
pub struct StoredTurn {
    pub role: String,
    pub content: String,
}

/// Per-tool execution record.
#[derive(Debug, Clone)]
pub struct ToolExecutionRecord {
    pub session_id: String,
    pub tool_name: String,
    pub input_preview: String,
    pub output_preview: Option<String>,
    pub safety_tier: String,
    pub user_confirmed: Option<bool>,
    pub duration_ms: Option<u64>,
}

/// Async wrapper around SQLite for all persistence operations.
pub struct MemoryStore {
    conn: Mutex<Connection>,
}

impl MemoryStore {
    /// Open or create the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // --- Conversations ---

    /// Append a conversation turn. Returns the turn id.
    pub async fn save_conversation_turn(
        &self,
        session_id: &str,
        role: &str,
        content: &str,
        tokens_used: Option<u32>,
        model: Option<&str>,
    ) -> Result<String, StoreError> {
        let turn_id = Uuid::new_v4().to_string();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO conversations (id, session_id, role, content, tokens_used, model) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![turn_id, session_id, role, content, tokens_used, model],
        )?;
        Ok(turn_id)
    }

    /// Fetch the most recent turns of a session in chronological order.
    pub async fn get_recent_history(
        &self,
        session_id: &str,
        max_turns: usize,
    ) -> Result<Vec<StoredTurn>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT role, content FROM conversations \
             WHERE session_id = ? ORDER BY rowid DESC LIMIT ?",
        )?;
        let mut turns = stmt
            .query_map(params![session_id, max_turns as i64], |row| {
                Ok(StoredTurn {
                    role: row.get(0)?,
                    content: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        // Query returns newest-first; callers want chronological
        turns.reverse();
        Ok(turns)
    }

    // --- Traces ---

    /// Persist a trace. Idempotent by trace id.
    pub async fn save_trace(&self, trace: &Trace) -> Result<(), StoreError> {
        let tools_called_json =
            serde_json::to_string(&trace.tools_called).unwrap_or_else(|_| "[]".to_string());
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO traces \
             (id, session_id, total_duration_ms, total_input_tokens, total_output_tokens, \
              total_cost_usd, iterations, tools_called_json, success, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                trace.trace_id,
                trace.session_id,
                trace.duration_ms as i64,
                trace.total_input_tokens as i64,
                trace.total_output_tokens as i64,
                trace.total_cost_usd,
                trace.iterations,
                tools_called_json,
                trace.success,
                trace.error_message,
            ],
        )?;
        Ok(())
    }

    /// Fetch a trace by id.
    pub async fn get_trace(&self, trace_id: &str) -> Result<Option<Trace>, StoreError> {
        let conn = self.conn.lock().await;
        let trace = conn
            .query_row(
                "SELECT id, session_id, total_duration_ms, total_input_tokens, \
                        total_output_tokens, total_cost_usd, iterations, tools_called_json, \
                        success, error_message \
                 FROM traces WHERE id = ?",
                params![trace_id],
                |row| {
                    let tools_json: String = row.get(7)?;
                    Ok(Trace {
                        trace_id: row.get(0)?,
                        session_id: row.get(1)?,
                        duration_ms: row.get::<_, i64>(2)? as u64,
                        total_input_tokens: row.get::<_, i64>(3)? as u64,
                        total_output_tokens: row.get::<_, i64>(4)? as u64,
                        total_cost_usd: row.get(5)?,
                        iterations: row.get(6)?,
                        tools_called: serde_json::from_str(&tools_json).unwrap_or_default(),
                        success: row.get(8)?,
                        error_message: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(trace)
    }

    // --- User Profile ---

    /// Read profile entries at or above a confidence floor, highest first.
    pub async fn get_user_profile(
        &self,
        min_confidence: f64,
    ) -> Result<Vec<(String, String, f64)>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT key, value, confidence FROM user_profile \
             WHERE confidence >= ? ORDER BY confidence DESC",
        )?;
        let entries = stmt
            .query_map(params![min_confidence], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Upsert a profile entry.
    ///
    /// A write whose confidence is not meaningfully higher than the
    /// existing entry's (new <= existing + 0.1) is a no-op.
    pub async fn set_profile_key(
        &self,
        key: &str,
        value: &str,
        confidence: f64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let existing: Option<f64> = conn
            .query_row(
                "SELECT confidence FROM user_profile WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_confidence) = existing {
            if confidence <= existing_confidence + 0.1 {
                return Ok(());
            }
        }

        conn.execute(
            "INSERT OR REPLACE INTO user_profile (key, value, confidence, updated_at) \
             VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
            params![key, value, confidence],
        )?;
        Ok(())
    }

    /// Render the profile as a `- key: value` digest for context injection.
    pub async fn get_profile_as_text(
        &self,
        min_confidence: f64,
    ) -> Result<Option<String>, StoreError> {
        let entries = self.get_user_profile(min_confidence).await?;
        if entries.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = entries
            .iter()
            .map(|(k, v, _)| format!("- {k}: {v}"))
            .collect();
        Ok(Some(lines.join("\n")))
    }

    // --- Session Summaries ---

    /// Persist a new summary for a session.
    pub async fn save_session_summary(
        &self,
        session_id: &str,
        summary: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO session_summaries (id, session_id, summary) VALUES (?, ?, ?)",
            params![Uuid::new_v4().to_string(), session_id, summary],
        )?;
        Ok(())
    }

    /// Fetch the most recent summary for a session.
    pub async fn get_session_summary(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().await;
        let summary = conn
            .query_row(
                "SELECT summary FROM session_summaries WHERE session_id = ? \
                 ORDER BY generated_at DESC, rowid DESC LIMIT 1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(summary)
    }

    // --- Tool Executions ---

    /// Record a tool execution with bounded previews.
    pub async fn save_tool_execution(&self, record: &ToolExecutionRecord) -> Result<(), StoreError> {
        let input_preview: String = record.input_preview.chars().take(100).collect();
        let output_preview: Option<String> = record
            .output_preview
            .as_ref()
            .map(|o| o.chars().take(500).collect());

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO tool_executions \
             (id, session_id, tool_name, input_preview, output_preview, \
              safety_tier, user_confirmed, duration_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                record.session_id,
                record.tool_name,
                input_preview,
                output_preview,
                record.safety_tier,
                record.user_confirmed,
                record.duration_ms.map(|d| d as i64),
            ],
        )?;
        Ok(())
    }

    // --- Chat Session Mapping ---

    /// Persist chat_id -> session_id so sessions survive restarts.
    pub async fn save_session_mapping(
        &self,
        chat_id: &str,
        session_id: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO chat_sessions (chat_id, session_id, updated_at) \
             VALUES (?, ?, CURRENT_TIMESTAMP)",
            params![chat_id, session_id],
        )?;
        Ok(())
    }

    /// Look up the session bound to an external chat identity.
    pub async fn get_session_id(&self, chat_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().await;
        let session_id = conn
            .query_row(
                "SELECT session_id FROM chat_sessions WHERE chat_id = ?",
                params![chat_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(session_id)
    }

    // --- Maintenance ---

    /// Purge conversations and traces past their retention windows.
    /// Idempotent.
    pub async fn cleanup_old_data(
        &self,
        conversations_ttl_days: u32,
        traces_ttl_days: u32,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "DELETE FROM conversations WHERE timestamp < datetime('now', '-{conversations_ttl_days} days')"
            ),
            [],
        )?;
        conn.execute(
            &format!("DELETE FROM traces WHERE timestamp < datetime('now', '-{traces_ttl_days} days')"),
            [],
        )?;
        info!(
            conv_ttl = conversations_ttl_days,
            trace_ttl = traces_ttl_days,
            "cleanup done"
        );
        Ok(())
    }

    /// Monthly decay: entries untouched for 30 days lose 0.05 confidence;
    /// entries falling below 0.1 are deleted.
    pub async fn decay_profile_confidence(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE user_profile \
             SET confidence = confidence - 0.05, updated_at = CURRENT_TIMESTAMP \
             WHERE updated_at < datetime('now', '-30 days')",
            [],
        )?;
        conn.execute("DELETE FROM user_profile WHERE confidence < 0.1", [])?;
        info!("profile confidence decayed");
        Ok(())
    }
}
