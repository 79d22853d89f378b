//! The Backtest Engine: deterministic candle-by-candle replay of a strategy against
//! historical OHLCV data through a simulated broker, producing an equity curve, trade ledger
//! and performance statistics. Reuses `ferrotrade_strategy::Strategy` directly and synchronously
//! — a backtest run never waits on I/O the way the live Bot Runtime does.

pub mod broker;
pub mod commission;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod slippage;

pub use broker::{PendingOrder, SimulatedBroker, SimulatedFill};
pub use commission::CommissionModel;
pub use engine::BacktestEngine;
pub use error::BacktestError;
pub use metrics::PerformanceStatistics;
pub use model::{BacktestConfig, BacktestResult, BacktestStatus, Candle, EquityPoint, ProgressEvent, TradeRecord};
pub use slippage::SlippageModel;
