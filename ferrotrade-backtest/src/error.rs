use thiserror::Error;

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no candles supplied for the requested date range")]
    EmptyCandleSet,

    #[error("invalid backtest configuration: {0}")]
    InvalidConfig(String),
}
