//! Ordered task list owned by one user.
//!
//! The order of `tasks` is semantically meaningful: it is the user's
//! explicit preference signal fed to the ranking oracle, and the
//! tiebreaker among tasks of equal urgency.
//!
//! # Invariants
//! - Task ids are unique within a list (enforced on insert).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskId};

/// An ordered sequence of tasks with list metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub id: Uuid,
    pub name: String,
    /// Tasks in display/manipulation order (index 0 = top)
    pub tasks: Vec<Task>,
    /// RFC3339 timestamp of the last persisted change
    pub updated_at: String,
}

impl TaskList {
    /// Create a new empty list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tasks: Vec::new(),
            updated_at: crate::store::now_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Find the current index of a task.
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Insert a task at the head of the order.
    ///
    /// New tasks enter at the top so the next batch sees them as the
    /// user's most recent priority signal.
    ///
    /// # Errors
    /// Returns `ListError::DuplicateTask` if the id already exists.
    pub fn insert_front(&mut self, task: Task) -> Result<(), ListError> {
        if self.position(task.id).is_some() {
            return Err(ListError::DuplicateTask(task.id));
        }
        self.tasks.insert(0, task);
        Ok(())
    }

    /// Remove a task by id, ending its lifecycle.
    pub fn remove(&mut self, id: TaskId) -> Result<Task, ListError> {
        let index = self.position(id).ok_or(ListError::UnknownTask(id))?;
        Ok(self.tasks.remove(index))
    }

    /// Move the task at `from` to `to`, preserving everyone else's
    /// relative order.
    pub fn move_task(&mut self, from: usize, to: usize) -> Result<(), ListError> {
        let len = self.tasks.len();
        if from >= len || to >= len {
            return Err(ListError::IndexOutOfBounds { from, to, len });
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        Ok(())
    }
}

/// Errors from list mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("task {0} already exists in this list")]
    DuplicateTask(TaskId),

    #[error("no task {0} in this list")]
    UnknownTask(TaskId),

    #[error("move {from} -> {to} out of bounds for list of {len}")]
    IndexOutOfBounds { from: usize, to: usize, len: usize },
}
