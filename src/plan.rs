//! Subscription plan tiers and their usage limits.
//!
//! Limits are enforced at the edge, before a mutation reaches the
//! engine; the engine itself is tier-agnostic.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    CosmicPro,
}

impl PlanTier {
    pub fn limits(&self) -> PlanLimits {
        match self {
            PlanTier::Free => PlanLimits {
                max_lists: Some(3),
                max_tasks_per_list: Some(20),
            },
            PlanTier::Pro | PlanTier::CosmicPro => PlanLimits {
                max_lists: None,
                max_tasks_per_list: None,
            },
        }
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "cosmic_pro" | "cosmic-pro" => Ok(PlanTier::CosmicPro),
            other => Err(format!("unknown plan tier: {}", other)),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Pro => write!(f, "pro"),
            PlanTier::CosmicPro => write!(f, "cosmic_pro"),
        }
    }
}

/// Usage caps for a tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub max_lists: Option<usize>,
    pub max_tasks_per_list: Option<usize>,
}

impl PlanLimits {
    pub fn allows_new_list(&self, current_lists: usize) -> bool {
        self.max_lists.map_or(true, |max| current_lists < max)
    }

    pub fn allows_new_task(&self, current_tasks: usize) -> bool {
        self.max_tasks_per_list
            .map_or(true, |max| current_tasks < max)
    }
}
