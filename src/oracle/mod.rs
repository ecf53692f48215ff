//! Ranking oracle abstraction.
//!
//! The oracle is an external, non-deterministic service consumed
//! behind a trait: it receives one ordered batch plus the current
//! date and answers with raw text that should decode to a JSON array
//! of `{id, rank, justification}` objects. Only the contract lives
//! here; enforcement is the validator's job.

mod error;
mod gemini;
mod prompt;

pub use error::{classify_http_status, OracleError, OracleErrorKind};
pub use gemini::{GeminiClient, DEFAULT_MODEL};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::rank::RankInput;

/// Trait for ranking oracles.
#[async_trait]
pub trait RankingOracle: Send + Sync {
    /// Submit one ordered batch for ranking.
    ///
    /// Returns the oracle's raw response text on transport success;
    /// the caller validates it against the permutation contract.
    async fn rank(&self, batch: &[RankInput], today: NaiveDate) -> Result<String, OracleError>;
}
