//! Ranking reconciliation engine for AI-ordered task lists.
//!
//! Tasks live in ordered lists; a remote "ranking oracle" (an LLM)
//! assigns each eligible task a priority rank. This crate reconciles
//! user-initiated mutations with oracle responses:
//!
//! - `task`: the task and list model with its lifecycle state machine
//! - `rank`: pure ranking primitives (batch building, response
//!   validation against the permutation contract, fallback ordering)
//! - `oracle`: the oracle trait and the Gemini-backed client
//! - `store`: pluggable persistence (memory, SQLite)
//! - `engine`: the reconciliation orchestrator tying it all together
//! - `plan`: subscription tiers and usage limits
//! - `config`: environment-driven configuration

pub mod config;
pub mod engine;
pub mod oracle;
pub mod plan;
pub mod rank;
pub mod store;
pub mod task;

pub use config::Config;
pub use engine::{BatchOutcome, EngineError, ListEvent, MutationOutcome, RankEngine};
pub use oracle::{GeminiClient, OracleError, RankingOracle};
pub use store::{create_task_store, TaskStore, TaskStoreType};
pub use task::{LifecycleState, Task, TaskId, TaskList};
