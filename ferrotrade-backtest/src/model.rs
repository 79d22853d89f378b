//! Data model for one backtest run: the candle series fed to the engine, the run
//! configuration, and the result record it produces.

use crate::commission::CommissionModel;
use crate::slippage::SlippageModel;
use chrono::{DateTime, Duration, Utc};
use ferrotrade_instrument::ExchangeId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. The engine replays these in ascending `open_time` order; callers are
/// responsible for supplying them pre-sorted and gap-free for the requested timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
 pub open_time: DateTime<Utc>,
 pub open: Decimal,
 pub high: Decimal,
 pub low: Decimal,
 pub close: Decimal,
 pub volume: Decimal,
}

/// Run configuration. `seed` makes the `SlippageModel::Random` arm (and therefore the whole
/// run) deterministic: the same config and candle set always produce a byte-identical result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
 pub symbol: String,
 pub venue: ExchangeId,
 pub timeframe: String,
 pub initial_capital: Decimal,
 pub commission: CommissionModel,
 pub slippage: SlippageModel,
 pub seed: u64,
}

impl BacktestConfig {
 pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>, initial_capital: Decimal) -> Self {
 Self {
 symbol: symbol.into(),
 venue: ExchangeId::BinanceUsdFutures,
 timeframe: timeframe.into(),
 initial_capital,
 commission: CommissionModel::None,
 slippage: SlippageModel::None,
 seed: 0,
 }
 }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum BacktestStatus {
 Running,
 Completed,
 Cancelled,
}

/// One point on the equity curve, sampled at every candle close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
 pub time: DateTime<Utc>,
 pub equity: Decimal,
}

/// One realized trade: a fill that closed or reduced a position (`ClosedTrade`,
/// adapted for the single-symbol, single-venue world a backtest run lives in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
 pub entry_time: DateTime<Utc>,
 pub exit_time: DateTime<Utc>,
 pub side: ferrotrade_exchange::model::Side,
 pub entry_price: Decimal,
 pub exit_price: Decimal,
 pub quantity: Decimal,
 pub commission_paid: Decimal,
 pub realized_pnl: Decimal,
}

impl TradeRecord {
 pub fn is_win(&self) -> bool {
 self.realized_pnl.is_sign_positive() && !self.realized_pnl.is_zero()
 }

 pub fn is_loss(&self) -> bool {
 self.realized_pnl.is_sign_negative()
 }

 pub fn duration(&self) -> Duration {
 self.exit_time - self.entry_time
 }
}

/// Emitted every 100 candles (step 4) so a caller can render run progress without
/// polling the whole result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
 pub candles_processed: usize,
 pub total_candles: usize,
 pub equity: Decimal,
}

/// The full output of a completed run (`BacktestResult`): the 25-metric statistics
/// block plus the equity curve and trade ledger that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
 pub status: BacktestStatus,
 pub config: BacktestConfig,
 pub seed: u64,
 pub final_equity: Decimal,
 pub equity_curve: Vec<EquityPoint>,
 pub trades: Vec<TradeRecord>,
 pub statistics: crate::metrics::PerformanceStatistics,
}
