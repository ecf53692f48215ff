//! Ranking response validator.
//!
//! The oracle's output is untrusted external input. This module
//! enforces the bijection contract: a valid response maps the batch's
//! task ids one-to-one onto the integers `1..=N`. On success the
//! returned mapping is that bijection; on any violation the specific
//! failure reason is returned and no partial result is ever exposed.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::task::TaskId;

use super::request::RankInput;

/// A validated rank and its justification for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    pub rank: u32,
    pub justification: String,
}

/// Why a ranking response was rejected.
///
/// Each contract rule has its own variant so the orchestrator can
/// surface a precise per-task failure reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("response does not decode to a JSON array of objects")]
    Malformed,

    #[error("response item lacks string id, integer rank, or string justification")]
    BadItemShape,

    #[error("response ranked unknown task id {0}")]
    UnknownId(String),

    #[error("response repeats task id {0}")]
    DuplicateId(String),

    #[error("rank {rank} is outside 1..={max}")]
    RankOutOfRange { rank: i64, max: usize },

    #[error("response repeats rank {0}")]
    DuplicateRank(i64),

    #[error("response does not cover every task and rank exactly once")]
    IncompletePermutation,
}

impl ValidationError {
    /// Stable short code for logs and per-task error reasons.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Malformed => "malformed",
            ValidationError::BadItemShape => "bad-item-shape",
            ValidationError::UnknownId(_) => "unknown-id",
            ValidationError::DuplicateId(_) => "duplicate-id",
            ValidationError::RankOutOfRange { .. } => "rank-out-of-range",
            ValidationError::DuplicateRank(_) => "duplicate-rank",
            ValidationError::IncompletePermutation => "incomplete-permutation",
        }
    }
}

/// Validate a raw oracle response against the submitted batch.
///
/// The rules run in contract order, each with a distinct failure
/// reason: decode, item shape, unknown id, duplicate id, rank range,
/// duplicate rank, and finally completeness. An empty batch accepts
/// exactly the empty array.
/// Extract a whole-number rank, whether encoded as an integer or an
/// integral float.
fn integer_value(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

pub fn validate_response(
    batch: &[RankInput],
    raw: &str,
) -> Result<HashMap<TaskId, RankAssignment>, ValidationError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ValidationError::Malformed)?;
    let items = value.as_array().ok_or(ValidationError::Malformed)?;

    let batch_ids: HashSet<TaskId> = batch.iter().map(|t| t.id).collect();
    let max = batch.len();

    let mut mapping: HashMap<TaskId, RankAssignment> = HashMap::with_capacity(max);
    let mut seen_ranks: HashSet<i64> = HashSet::with_capacity(max);

    for item in items {
        let obj = item.as_object().ok_or(ValidationError::Malformed)?;

        let id_str = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ValidationError::BadItemShape)?;
        // Ranks may arrive as `2` or `2.0`; either way the value must
        // be a whole number.
        let rank = obj
            .get("rank")
            .and_then(integer_value)
            .ok_or(ValidationError::BadItemShape)?;
        let justification = obj
            .get("justification")
            .and_then(Value::as_str)
            .ok_or(ValidationError::BadItemShape)?;

        let id = TaskId::parse(id_str)
            .filter(|id| batch_ids.contains(id))
            .ok_or_else(|| ValidationError::UnknownId(id_str.to_string()))?;

        if mapping.contains_key(&id) {
            return Err(ValidationError::DuplicateId(id_str.to_string()));
        }

        if rank < 1 || rank > max as i64 {
            return Err(ValidationError::RankOutOfRange { rank, max });
        }

        if !seen_ranks.insert(rank) {
            return Err(ValidationError::DuplicateRank(rank));
        }

        mapping.insert(
            id,
            RankAssignment {
                rank: rank as u32,
                justification: justification.to_string(),
            },
        );
    }

    // Ids are a subset of the batch and ranks are distinct in 1..=N, so
    // full cardinality is exactly the bijection condition.
    if mapping.len() != max {
        return Err(ValidationError::IncompletePermutation);
    }

    Ok(mapping)
}
