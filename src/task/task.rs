//! Core task type and its ranking lifecycle.
//!
//! # Invariants
//! - `rank.is_some()` exactly when `state == Ranked`; `justification`
//!   travels with `rank` and is cleared with it.
//! - `text` is non-empty (checked at construction).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task.
///
/// Stable for the task's lifetime; unique within a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Create a new unique task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse an ID from its string form (as echoed back by the oracle).
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a task sits in the ranking lifecycle.
///
/// # State Machine
/// ```text
/// Idle ----> Pending ----> Ranked
///                     \--> Errored
/// Ranked --> Pending        (next batch)
/// Errored -> (removal only; errored tasks are not re-submitted)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Created, never submitted for ranking
    Idle,
    /// Part of an in-flight ranking batch
    Pending,
    /// Carries a valid rank and justification from the last batch
    Ranked,
    /// The last batch failed for this task, or the oracle omitted it
    Errored { reason: String },
}

impl LifecycleState {
    /// Errored tasks are excluded from future batches until removed.
    pub fn is_errored(&self) -> bool {
        matches!(self, LifecycleState::Errored { .. })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LifecycleState::Pending)
    }

    pub fn is_ranked(&self) -> bool {
        matches!(self, LifecycleState::Ranked)
    }
}

/// One user-visible work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, stable for the task's lifetime
    pub id: TaskId,

    /// User-supplied description (non-empty)
    pub text: String,

    /// Optional calendar due date (no time component)
    pub due_date: Option<NaiveDate>,

    /// Rank assigned by the last ranking batch (1 = most important).
    /// Meaningful only relative to the tasks ranked in the same batch.
    pub rank: Option<u32>,

    /// Short human-readable explanation for `rank`
    pub justification: Option<String>,

    /// Current lifecycle state
    pub state: LifecycleState,
}

impl Task {
    /// Create a new idle task.
    ///
    /// # Errors
    /// Returns `TaskError::EmptyText` if `text` is empty after trimming.
    pub fn new(text: impl Into<String>, due_date: Option<NaiveDate>) -> Result<Self, TaskError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TaskError::EmptyText);
        }

        Ok(Self {
            id: TaskId::new(),
            text,
            due_date,
            rank: None,
            justification: None,
            state: LifecycleState::Idle,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn is_ranked(&self) -> bool {
        self.state.is_ranked()
    }

    pub fn is_errored(&self) -> bool {
        self.state.is_errored()
    }

    /// The recorded failure reason, if errored.
    pub fn error_reason(&self) -> Option<&str> {
        match &self.state {
            LifecycleState::Errored { reason } => Some(reason),
            _ => None,
        }
    }

    /// Enter a new ranking batch: clear any previous rank and go pending.
    ///
    /// Callers must not submit errored tasks; the whole-list invariant is
    /// that every non-errored task of a batch goes pending together.
    pub fn mark_pending(&mut self) {
        debug_assert!(!self.is_errored(), "errored tasks are not re-submitted");
        self.rank = None;
        self.justification = None;
        self.state = LifecycleState::Pending;
    }

    /// Settle this task with a validated rank from the current batch.
    pub fn apply_rank(&mut self, rank: u32, justification: String) {
        self.rank = Some(rank);
        self.justification = Some(justification);
        self.state = LifecycleState::Ranked;
    }

    /// Settle this task as errored; any stale rank is discarded.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.rank = None;
        self.justification = None;
        self.state = LifecycleState::Errored {
            reason: reason.into(),
        };
    }
}

/// Errors that can occur constructing tasks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task text cannot be empty")]
    EmptyText,
}
