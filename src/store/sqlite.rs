//! SQLite-based task store.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::task::{LifecycleState, Task, TaskId, TaskList};

use super::{ListSummary, TaskStore};

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS task_lists (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lists_updated_at ON task_lists(updated_at DESC);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    list_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    due_date TEXT,
    rank INTEGER,
    justification TEXT,
    state TEXT NOT NULL,
    error_reason TEXT,
    FOREIGN KEY (list_id) REFERENCES task_lists(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tasks_list ON tasks(list_id, position);
"#;

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        let db_path = base_dir.join("tasks.db");

        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create task store dir: {}", e))?;

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;

            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;

            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn state_columns(state: &LifecycleState) -> (&'static str, Option<&str>) {
        match state {
            LifecycleState::Idle => ("idle", None),
            LifecycleState::Pending => ("pending", None),
            LifecycleState::Ranked => ("ranked", None),
            LifecycleState::Errored { reason } => ("errored", Some(reason)),
        }
    }

    fn state_from_columns(state: &str, error_reason: Option<String>) -> LifecycleState {
        match state {
            "pending" => LifecycleState::Pending,
            "ranked" => LifecycleState::Ranked,
            "errored" => LifecycleState::Errored {
                reason: error_reason.unwrap_or_default(),
            },
            _ => LifecycleState::Idle,
        }
    }

    fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        let id: String = row.get("id")?;
        let text: String = row.get("text")?;
        let due_date: Option<String> = row.get("due_date")?;
        let rank: Option<u32> = row.get("rank")?;
        let justification: Option<String> = row.get("justification")?;
        let state: String = row.get("state")?;
        let error_reason: Option<String> = row.get("error_reason")?;

        Ok(Task {
            id: TaskId::parse(&id).unwrap_or_default(),
            text,
            due_date: due_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            rank,
            justification,
            state: Self::state_from_columns(&state, error_reason),
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn list_lists(&self) -> Result<Vec<ListSummary>, String> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT l.id, l.name, l.updated_at,
                        (SELECT COUNT(*) FROM tasks t WHERE t.list_id = l.id) AS task_count
                 FROM task_lists l ORDER BY l.updated_at DESC",
            )
            .map_err(|e| format!("Failed to prepare list query: {}", e))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let updated_at: String = row.get(2)?;
                let task_count: i64 = row.get(3)?;
                Ok((id, name, updated_at, task_count))
            })
            .map_err(|e| format!("Failed to query lists: {}", e))?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, updated_at, task_count) =
                row.map_err(|e| format!("Failed to read list row: {}", e))?;
            let id = Uuid::parse_str(&id).map_err(|e| format!("Corrupt list id: {}", e))?;
            summaries.push(ListSummary {
                id,
                name,
                task_count: task_count as usize,
                updated_at,
            });
        }
        Ok(summaries)
    }

    async fn load_list(&self, id: Uuid) -> Result<Option<TaskList>, String> {
        let conn = self.conn.lock().await;

        let header: Option<(String, String)> = conn
            .query_row(
                "SELECT name, updated_at FROM task_lists WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| format!("Failed to load list: {}", e))?;

        let Some((name, updated_at)) = header else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare(
                "SELECT id, text, due_date, rank, justification, state, error_reason
                 FROM tasks WHERE list_id = ?1 ORDER BY position",
            )
            .map_err(|e| format!("Failed to prepare task query: {}", e))?;

        let tasks = stmt
            .query_map(params![id.to_string()], Self::row_to_task)
            .map_err(|e| format!("Failed to query tasks: {}", e))?
            .collect::<rusqlite::Result<Vec<Task>>>()
            .map_err(|e| format!("Failed to read task row: {}", e))?;

        Ok(Some(TaskList {
            id,
            name,
            tasks,
            updated_at,
        }))
    }

    async fn save_list(&self, list: &TaskList) -> Result<(), String> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| format!("Failed to begin transaction: {}", e))?;

        tx.execute(
            "INSERT INTO task_lists (id, name, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = ?2, updated_at = ?3",
            params![list.id.to_string(), list.name, list.updated_at],
        )
        .map_err(|e| format!("Failed to upsert list: {}", e))?;

        // Positions are authoritative, so rewrite the whole task set.
        tx.execute(
            "DELETE FROM tasks WHERE list_id = ?1",
            params![list.id.to_string()],
        )
        .map_err(|e| format!("Failed to clear tasks: {}", e))?;

        for (position, task) in list.tasks.iter().enumerate() {
            let (state, error_reason) = Self::state_columns(&task.state);
            tx.execute(
                "INSERT INTO tasks
                 (id, list_id, position, text, due_date, rank, justification, state, error_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.id.to_string(),
                    list.id.to_string(),
                    position as i64,
                    task.text,
                    task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    task.rank,
                    task.justification,
                    state,
                    error_reason,
                ],
            )
            .map_err(|e| format!("Failed to insert task: {}", e))?;
        }

        tx.commit()
            .map_err(|e| format!("Failed to commit save: {}", e))
    }

    async fn delete_list(&self, id: Uuid) -> Result<bool, String> {
        let conn = self.conn.lock().await;
        let deleted = conn
            .execute(
                "DELETE FROM task_lists WHERE id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| format!("Failed to delete list: {}", e))?;
        Ok(deleted > 0)
    }
}
