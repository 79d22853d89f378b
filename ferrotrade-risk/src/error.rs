use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RiskError {
    #[error("no risk limits configured for user {0}")]
    NoLimitsConfigured(String),

    #[error("user {0} is already mid emergency-stop")]
    EmergencyStopInProgress(String),
}
