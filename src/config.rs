//! Environment-driven configuration.

use std::env;
use std::path::PathBuf;

use crate::oracle::DEFAULT_MODEL;
use crate::plan::PlanTier;
use crate::store::TaskStoreType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key (required)
    pub api_key: String,
    /// Model identifier passed to the ranking backend
    pub model: String,
    /// Base directory for on-disk state
    pub data_dir: PathBuf,
    /// Which task store backend to use
    pub store_type: TaskStoreType,
    /// Subscription tier for limit enforcement
    pub plan: PlanTier,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = env::var("RANKER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".task-ranker"));

        let store_type = TaskStoreType::from_str(
            &env::var("TASK_STORE").unwrap_or_else(|_| "sqlite".to_string()),
        );

        let plan = match env::var("RANKER_PLAN") {
            Ok(raw) => raw
                .parse::<PlanTier>()
                .map_err(|message| ConfigError::InvalidValue {
                    var: "RANKER_PLAN".to_string(),
                    message,
                })?,
            Err(_) => PlanTier::default(),
        };

        Ok(Self {
            api_key,
            model,
            data_dir,
            store_type,
            plan,
        })
    }
}
