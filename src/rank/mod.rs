//! Ranking primitives: request building, response validation, and the
//! deterministic fallback ordering.
//!
//! All three are pure; the reconciliation engine wires them to the
//! oracle and the store.

mod order;
mod request;
mod validate;

pub use order::{sort_for_display, urgency_tier, UrgencyTier, DUE_SOON_WINDOW_DAYS};
pub use request::{build_batch, RankInput};
pub use validate::{validate_response, RankAssignment, ValidationError};
