//! Every component error enum converges here: `CoreError` is the only error type the
//! command surface returns, and [`ErrorKind`] is the sole thing the HTTP edge inspects to pick a
//! status code — nothing upstream of this module matches on a component-specific variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
 #[error(transparent)]
 Instrument(#[from] ferrotrade_instrument::InstrumentError),

 #[error(transparent)]
 Exchange(#[from] ferrotrade_exchange::ExchangeError),

 #[error(transparent)]
 Data(#[from] ferrotrade_data::DataError),

 #[error(transparent)]
 Cache(#[from] ferrotrade_cache::CacheError),

 #[error(transparent)]
 Portfolio(#[from] ferrotrade_portfolio::PortfolioError),

 #[error(transparent)]
 Risk(#[from] ferrotrade_risk::RiskError),

 #[error(transparent)]
 Execution(#[from] ferrotrade_execution::ExecutionError),

 #[error(transparent)]
 Job(#[from] ferrotrade_jobs::JobError),

 #[error(transparent)]
 Strategy(#[from] ferrotrade_strategy::StrategyError),

 #[error(transparent)]
 Backtest(#[from] ferrotrade_backtest::BacktestError),

 #[error(transparent)]
 Distribution(#[from] ferrotrade_ws::WsError),

 #[error(transparent)]
 Config(#[from] crate::config::ConfigError),

 #[error("{0} not found")]
 NotFound(String),

 #[error("{0} already exists")]
 Duplicate(String),

 #[error("entity is not owned by the requesting user")]
 OwnershipMismatch,

 #[error("invalid state for this operation: {0}")]
 InvalidState(String),

 #[error("preflight failed: {0:?}")]
 PreflightFailed(Vec<String>),

 #[error("job {0} timed out")]
 JobTimeout(String),

 #[error("validation failed: {0}")]
 Validation(String),

 #[error("internal error: {0}")]
 Internal(String),
}

/// The REST status-code classification: one entry per status band, never a raw code,
/// so the HTTP edge stays decoupled from this enum's exact shape.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
 BadRequest,
 Unauthorized,
 Forbidden,
 NotFound,
 Conflict,
 Unprocessable,
 ServiceUnavailable,
 Internal,
}

impl CoreError {
 pub fn kind(&self) -> ErrorKind {
 use ferrotrade_exchange::ExchangeError as Exch;
 use ferrotrade_execution::ExecutionError as Exec;

 match self {
 CoreError::Validation(_) | CoreError::Duplicate(_) | CoreError::Config(_) => ErrorKind::BadRequest,
 CoreError::OwnershipMismatch => ErrorKind::Forbidden,
 CoreError::NotFound(_) => ErrorKind::NotFound,
 CoreError::InvalidState(_) => ErrorKind::Conflict,
 CoreError::PreflightFailed(_) => ErrorKind::Unprocessable,
 CoreError::Risk(_) => ErrorKind::Unprocessable,
 CoreError::JobTimeout(_) => ErrorKind::ServiceUnavailable,
 CoreError::Execution(err) => match err {
 Exec::Validation(_) => ErrorKind::BadRequest,
 Exec::RiskViolation { .. } => ErrorKind::Unprocessable,
 Exec::NotFound(_) => ErrorKind::NotFound,
 Exec::NotCancellable(_) | Exec::InsufficientBalance { .. } => ErrorKind::Conflict,
 Exec::Exchange(Exch::ExchangeTransient { .. }) => ErrorKind::ServiceUnavailable,
 Exec::Exchange(_) | Exec::Portfolio(_) => ErrorKind::Internal,
 },
 CoreError::Exchange(Exch::ExchangeTransient { .. }) => ErrorKind::ServiceUnavailable,
 CoreError::Exchange(_) => ErrorKind::Internal,
 CoreError::Instrument(_)
 | CoreError::Data(_)
 | CoreError::Cache(_)
 | CoreError::Portfolio(_)
 | CoreError::Job(_)
 | CoreError::Strategy(_)
 | CoreError::Backtest(_)
 | CoreError::Distribution(_)
 | CoreError::Internal(_) => ErrorKind::Internal,
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn a_risk_violation_maps_to_unprocessable() {
 let err = CoreError::Execution(ferrotrade_execution::ExecutionError::RiskViolation {
 limit: ferrotrade_risk::RiskLimitKind::Leverage,
 });
 assert_eq!(err.kind, ErrorKind::Unprocessable);
 }

 #[test]
 fn not_found_maps_to_404_band() {
 assert_eq!(CoreError::NotFound("bot".to_string()).kind, ErrorKind::NotFound);
 }

 #[test]
 fn ownership_mismatch_maps_to_403_band() {
 assert_eq!(CoreError::OwnershipMismatch.kind, ErrorKind::Forbidden);
 }
}
