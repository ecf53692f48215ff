//! Ranking request builder.
//!
//! Pure and side-effect-free: snapshots the list's current order into
//! the wire shape the oracle is prompted with. The order of the batch
//! is the primary priority signal, so it must equal the display order
//! at the instant of the triggering mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// One task as submitted to the ranking oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankInput {
    pub id: TaskId,
    pub text: String,
    /// Serialized as `"YYYY-MM-DD"` or `null`, matching the prompt contract
    #[serde(rename = "dueDate")]
    pub due_date: Option<NaiveDate>,
}

/// Build the ordered batch for a ranking request.
///
/// Includes every task that is not errored, in list order. An empty
/// result means there is nothing to rank and callers must treat the
/// batch as a no-op completion, not an error.
pub fn build_batch(tasks: &[Task]) -> Vec<RankInput> {
    tasks
        .iter()
        .filter(|t| !t.is_errored())
        .map(|t| RankInput {
            id: t.id,
            text: t.text.clone(),
            due_date: t.due_date,
        })
        .collect()
}
