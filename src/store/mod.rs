//! Task-list storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database, one row per task with explicit position
//!
//! Both backends are read-your-writes: a saved list, when reloaded,
//! yields the same tasks with the same id, text, due date, rank,
//! justification, and lifecycle state as last persisted.

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::task::TaskList;

/// Get current timestamp as RFC3339 string.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Lightweight list descriptor for dashboards and pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: Uuid,
    pub name: String,
    pub task_count: usize,
    pub updated_at: String,
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// List summaries, ordered by updated_at descending.
    async fn list_lists(&self) -> Result<Vec<ListSummary>, String>;

    /// Load a full list by ID.
    async fn load_list(&self, id: Uuid) -> Result<Option<TaskList>, String>;

    /// Save a list, replacing any previous contents atomically.
    async fn save_list(&self, list: &TaskList) -> Result<(), String>;

    /// Delete a list. Returns whether it existed.
    async fn delete_list(&self, id: Uuid) -> Result<bool, String>;
}

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl TaskStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            _ => Self::default(),
        }
    }
}

/// Create a task store based on type and configuration.
pub async fn create_task_store(
    store_type: TaskStoreType,
    base_dir: PathBuf,
) -> Result<Box<dyn TaskStore>, String> {
    match store_type {
        TaskStoreType::Memory => Ok(Box::new(InMemoryTaskStore::new())),
        TaskStoreType::Sqlite => {
            let store = SqliteTaskStore::new(base_dir).await?;
            Ok(Box::new(store))
        }
    }
}
