use crate::state_machine::InvalidBotTransition;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid strategy parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidBotTransition),

    #[error("checkpoint store error: {0}")]
    Cache(String),

    #[error("order placement failed: {0}")]
    OrderPlacement(String),

    #[error("preflight failed: {0:?}")]
    PreflightFailed(Vec<String>),
}

impl From<ferrotrade_cache::CacheError> for StrategyError {
    fn from(err: ferrotrade_cache::CacheError) -> Self {
        StrategyError::Cache(err.to_string())
    }
}
