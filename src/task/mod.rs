//! Task and task-list model: entities, invariants, and lifecycle
//! transitions. No ranking behavior lives here.

mod list;
mod task;

pub use list::{ListError, TaskList};
pub use task::{LifecycleState, Task, TaskError, TaskId};
