//! Deterministic fallback ordering.
//!
//! Orders a task array when not every task carries a valid rank from
//! the most recent batch, and doubles as the final comparator after a
//! successful batch (tasks ranked by the current batch sort first, in
//! rank order, which degenerates to pure rank order when everything
//! non-errored is ranked).
//!
//! The sort is stable: when every criterion ties, tasks keep their
//! relative order from the last stable ordering.

use chrono::{Datelike, NaiveDate};

use crate::task::{LifecycleState, Task};

/// Days ahead of today that still count as "due soon".
pub const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Coarse ordering bucket for tasks without a usable rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrgencyTier {
    /// Due date strictly before today
    Overdue,
    DueToday,
    /// Due within the next `DUE_SOON_WINDOW_DAYS` days
    DueSoon,
    /// Due further out, or no due date at all
    Later,
}

/// Classify a due date relative to today.
pub fn urgency_tier(due_date: Option<NaiveDate>, today: NaiveDate) -> UrgencyTier {
    match due_date {
        None => UrgencyTier::Later,
        Some(due) => {
            if due < today {
                UrgencyTier::Overdue
            } else if due == today {
                UrgencyTier::DueToday
            } else if (due - today).num_days() <= DUE_SOON_WINDOW_DAYS {
                UrgencyTier::DueSoon
            } else {
                UrgencyTier::Later
            }
        }
    }
}

/// Sort tasks into display order, earlier = higher priority.
///
/// Criteria, in order:
/// 1. current-batch rank ascending (ranked tasks before everything else)
/// 2. pending before non-pending; pending tasks all tie, so they keep
///    their relative order (the mutation order while a batch is in flight)
/// 3. among non-pending tasks: urgency tier, ties by ascending due
///    date, "no date" last
/// 4. errored after non-errored of equal tier
/// 5. stable: previous relative order breaks any remaining tie
pub fn sort_for_display(tasks: &mut [Task], today: NaiveDate) {
    tasks.sort_by_key(|t| sort_key(t, today));
}

/// Composite sort key. Ranked tasks collapse to their rank, pending
/// tasks to a single bucket; everything else orders by
/// (tier, errored, due date).
fn sort_key(task: &Task, today: NaiveDate) -> (u8, i64, u8, u8, u8, i64) {
    if let (LifecycleState::Ranked, Some(rank)) = (&task.state, task.rank) {
        return (0, rank as i64, 0, 0, 0, 0);
    }

    // Pending tasks must not be reordered by urgency: the in-flight
    // display order is the mutation order.
    if task.is_pending() {
        return (1, 0, 0, 0, 0, 0);
    }

    let tier = urgency_tier(task.due_date, today) as u8;
    let errored = if task.is_errored() { 1 } else { 0 };
    let due_ord = task
        .due_date
        .map(|d| i64::from(d.num_days_from_ce()))
        .unwrap_or(i64::MAX);

    (1, 0, 1, tier, errored, due_ord)
}
