use ferrotrade_exchange::ExchangeError;
use ferrotrade_instrument::InstrumentError;
use ferrotrade_portfolio::PortfolioError;
use ferrotrade_risk::RiskLimitKind;
use thiserror::Error;

/// The Order Router's failure taxonomy (public contract): `placeOrder` can fail with
/// any variant here, `cancelOrder` only with `NotFound`/`NotCancellable`/`ExchangeRejected`/
/// `ExchangeTransient`.
#[derive(Debug, Error, Clone)]
pub enum ExecutionError {
 #[error("validation failed: {0}")]
 Validation(String),

 #[error("insufficient balance: need {required} {asset}, have {available}")]
 InsufficientBalance {
 asset: String,
 required: rust_decimal::Decimal,
 available: rust_decimal::Decimal,
 },

 #[error("risk violation: {limit:?}")]
 RiskViolation { limit: RiskLimitKind },

 #[error("order {0} not found")]
 NotFound(String),

 #[error("order {0} is not cancellable in its current state")]
 NotCancellable(String),

 #[error(transparent)]
 Exchange(#[from] ExchangeError),

 #[error("portfolio update failed: {0}")]
 Portfolio(String),
}

impl From<InstrumentError> for ExecutionError {
 fn from(err: InstrumentError) -> Self {
 ExecutionError::Validation(err.to_string())
 }
}

impl From<PortfolioError> for ExecutionError {
 fn from(err: PortfolioError) -> Self {
 ExecutionError::Portfolio(err.to_string())
 }
}
