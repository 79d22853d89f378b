//! The replay loop (steps 1-5): for each candle, mark progress, publish `onTick`,
//! advance the simulated broker, mark the position to market, and sample the equity curve.

use crate::broker::{PendingOrder, SimulatedBroker, SimulatedFill};
use crate::error::BacktestError;
use crate::metrics;
use crate::model::{BacktestConfig, BacktestResult, BacktestStatus, Candle, EquityPoint, ProgressEvent, TradeRecord};
use ferrotrade_execution::{Order, OrderStatus};
use ferrotrade_instrument::AssetName;
use ferrotrade_integration::Id;
use ferrotrade_exchange::model::Side;
use ferrotrade_portfolio::{Fill as PortfolioFill, Position, Side as PortfolioSide};
use ferrotrade_strategy::{MarketTick, Strategy, StrategyAction, TickEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const PROGRESS_INTERVAL: usize = 100;

pub struct BacktestEngine {
 config: BacktestConfig,
 strategy: Box<dyn Strategy>,
}

impl BacktestEngine {
 pub fn new(config: BacktestConfig, strategy: Box<dyn Strategy>) -> Self {
 Self { config, strategy }
 }

 /// Replays `candles` in order. Returns `Ok(None)` if `cancel` was observed set before the
 /// run finished: the candles already processed leave their trace only in the progress
 /// events already emitted to `on_progress`, and no [`BacktestResult`] is produced for a
 /// cancelled run (cancellation persists partial progress, not a result record).
 pub fn run( &mut self,
 candles: Vec<Candle>,
 cancel: Arc<AtomicBool>,
 mut on_progress: impl FnMut(ProgressEvent),
) -> Result<Option<BacktestResult>, BacktestError> {
 if candles.is_empty() {
 return Err(BacktestError::EmptyCandleSet);
 }

 let mut broker = SimulatedBroker::new(self.config.commission.clone(), self.config.slippage.clone());
 let mut rng = StdRng::seed_from_u64(self.config.seed);
 let user = Id::new();

 let mut cash = self.config.initial_capital;
 let mut position: Option<Position> = None;
 let mut equity_curve = Vec::with_capacity(candles.len());
 let mut trades = Vec::new();
 let mut trade_counter: u64 = 0;
 let candles_per_day = candles_per_day(&self.config.timeframe);

 for (index, candle) in candles.iter().enumerate() {
 if cancel.load(Ordering::Relaxed) {
 info!(candles_processed = index, total_candles = candles.len(), "backtest run cancelled");
 return Ok(None);
 }

 let tick = TickEvent::Market(MarketTick {
 symbol: self.config.symbol.clone(),
 price: candle.close,
 event_time: candle.open_time,
 });
 let actions = self.strategy.on_tick(&tick);

 for action in actions {
 match action {
 StrategyAction::PlaceOrder(request) => {
 let pending = PendingOrder {
 id: Id::new(),
 side: request.side,
 order_type: request.order_type,
 price: request.price,
 quantity: request.quantity,
 reduce_only: request.reduce_only,
 };
 let fill_candle = candles.get(index + 1);
 if let Some(fill) = broker.submit(pending, candle, fill_candle, &mut rng) {
 self.apply_fill(fill, candle, user, &mut cash, &mut position, &mut trades, &mut trade_counter);
 }
 }
 // The broker has no resting-order cancellation book today: only limit
 // orders rest, and this engine has no order id the strategy could reference
 // back (ids are minted inside the broker, not returned to strategy code).
 StrategyAction::CancelOrder(_) => {}
 }
 }

 for fill in broker.advance(candle, &mut rng) {
 self.apply_fill(fill, candle, user, &mut cash, &mut position, &mut trades, &mut trade_counter);
 }

 if let Some(position) = position.as_mut() {
 position.update_mark_price(candle.close);
 }

 let equity = current_equity(cash, position.as_ref());
 equity_curve.push(EquityPoint { time: candle.open_time, equity });

 if (index + 1) % PROGRESS_INTERVAL == 0 {
 let event = ProgressEvent {
 candles_processed: index + 1,
 total_candles: candles.len(),
 equity,
 };
 debug!(?event, "backtest progress");
 on_progress(event);
 }
 }

 let final_equity = equity_curve.last.map(|p| p.equity).unwrap_or(self.config.initial_capital);
 let statistics = metrics::compute(self.config.initial_capital, &equity_curve, &trades, candles_per_day);

 Ok(Some(BacktestResult {
 status: BacktestStatus::Completed,
 config: self.config.clone(),
 seed: self.config.seed,
 final_equity,
 equity_curve,
 trades,
 statistics,
 }))
 }

 #[allow(clippy::too_many_arguments)]
 fn apply_fill( &mut self,
 fill: SimulatedFill,
 candle: &Candle,
 user: Id,
 cash: &mut Decimal,
 position: &mut Option<Position>,
 trades: &mut Vec<TradeRecord>,
 trade_counter: &mut u64,
) {
 *trade_counter += 1;
 *cash -= fill.commission;

 let portfolio_fill = PortfolioFill {
 side: to_portfolio_side(fill.side),
 price: fill.price,
 quantity: fill.quantity,
 fee: fill.commission,
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: *trade_counter,
 venue_timestamp: candle.open_time,
 };

 let entry_price_before = position.as_ref().map(|p| p.entry_price);
 let entry_time_before = position.as_ref().map(|p| p.opened_at);

 match position {
 Some(existing) if !existing.is_flat() => match existing.apply_fill(&portfolio_fill) {
 Ok(Some(closed)) => {
 *cash += closed.realized_pnl;
 trades.push(TradeRecord {
 entry_time: entry_time_before.unwrap_or(candle.open_time),
 exit_time: candle.open_time,
 side: fill.side,
 entry_price: entry_price_before.unwrap_or(closed.exit_price),
 exit_price: closed.exit_price,
 quantity: closed.closed_quantity,
 commission_paid: fill.commission,
 realized_pnl: closed.realized_pnl,
 });
 }
 Ok(None) => {}
 Err(err) => tracing::warn!(%err, "discarded a fill the portfolio model rejected"),
 },
 _ => match Position::open(user, self.config.venue, self.config.symbol.clone(), &portfolio_fill) {
 Ok(opened) => *position = Some(opened),
 Err(err) => tracing::warn!(%err, "discarded an opening fill the portfolio model rejected"),
 },
 }

 if let Some(current) = position.as_ref() {
 self.strategy.on_position_update(current);
 }

 let order = synthetic_filled_order(user, self.config.venue, &self.config.symbol, &fill, candle);
 self.strategy.on_order_update(&order);
 }
}

fn to_portfolio_side(side: Side) -> PortfolioSide {
 match side {
 Side::Buy => PortfolioSide::Buy,
 Side::Sell => PortfolioSide::Sell,
 }
}

fn current_equity(cash: Decimal, position: Option<&Position>) -> Decimal {
 cash + position.map(|p| p.unrealized_pnl).unwrap_or(Decimal::ZERO)
}

/// A fully-filled `Order` record for `on_order_update`: the broker fills are never submitted
/// through the real Order Router, so there is no persisted `Order` to hand back — this
/// synthesizes the terminal view a strategy would have seen from one.
fn synthetic_filled_order( user: Id,
 venue: ferrotrade_instrument::ExchangeId,
 symbol: &str,
 fill: &SimulatedFill,
 candle: &Candle,
) -> Order {
 Order {
 id: fill.order_id,
 user,
 venue,
 symbol: symbol.to_string(),
 client_order_id: fill.order_id.to_string(),
 venue_order_id: None,
 side: fill.side,
 order_type: ferrotrade_exchange::model::OrderType::Market,
 time_in_force: None,
 quantity: fill.quantity,
 price: Some(fill.price),
 reduce_only: fill.reduce_only,
 status: OrderStatus::Filled,
 filled_quantity: fill.quantity,
 last_venue_trade_id: None,
 created_at: candle.open_time,
 updated_at: candle.open_time,
 }
}

fn candles_per_day(timeframe: &str) -> f64 {
 let minutes = match timeframe {
 "1m" => 1.0,
 "5m" => 5.0,
 "15m" => 15.0,
 "30m" => 30.0,
 "1h" => 60.0,
 "4h" => 240.0,
 "1d" => 1440.0,
 _ => 60.0,
 };
 (1440.0 / minutes).max(1.0)
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::commission::CommissionModel;
 use crate::slippage::SlippageModel;
 use chrono::{TimeZone, Utc};
 use rust_decimal_macros::dec;
 use serde_json::Value;

 struct BuyOnceStrategy {
 placed: bool,
 }

 impl Strategy for BuyOnceStrategy {
 fn on_tick(&mut self, _event: &TickEvent) -> Vec<StrategyAction> {
 if self.placed {
 return Vec::new();
 }
 self.placed = true;
 vec![StrategyAction::PlaceOrder(ferrotrade_execution::NewOrderRequest {
 symbol: "BTCUSDT".to_string(),
 side: Side::Buy,
 order_type: ferrotrade_exchange::model::OrderType::Market,
 time_in_force: None,
 quantity: dec!(1),
 price: None,
 reduce_only: false,
 reference_price: dec!(100),
 })]
 }

 fn on_order_update(&mut self, _order: &Order) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn on_position_update(&mut self, _position: &ferrotrade_portfolio::Position) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn checkpoint(&self) -> Value {
 Value::Null
 }

 fn restore(&mut self, _state: Value) {}
 }

 fn candle(minute: u32, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
 Candle {
 open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
 open,
 high,
 low,
 close,
 volume: dec!(1000),
 }
 }

 #[test]
 fn a_completed_run_produces_a_result_with_one_realized_opening_trade() {
 let config = BacktestConfig::new("BTCUSDT", "1m", dec!(10000));
 let candles = vec![
 candle(0, dec!(100), dec!(101), dec!(99), dec!(100)),
 candle(1, dec!(100), dec!(102), dec!(99), dec!(101)),
 candle(2, dec!(101), dec!(103), dec!(100), dec!(102)),
 ];
 let mut engine = BacktestEngine::new(config, Box::new(BuyOnceStrategy { placed: false }));
 let result = engine
 .run(candles, Arc::new(AtomicBool::new(false)), |_| {})
 .unwrap()
 .expect("run completes");
 assert_eq!(result.status, BacktestStatus::Completed);
 assert_eq!(result.equity_curve.len(), 3);
 }

 #[test]
 fn a_cancelled_run_returns_no_result() {
 let config = BacktestConfig::new("BTCUSDT", "1m", dec!(10000));
 let candles = vec![
 candle(0, dec!(100), dec!(101), dec!(99), dec!(100)),
 candle(1, dec!(100), dec!(102), dec!(99), dec!(101)),
 ];
 let cancel = Arc::new(AtomicBool::new(true));
 let mut engine = BacktestEngine::new(config, Box::new(BuyOnceStrategy { placed: false }));
 let result = engine.run(candles, cancel, |_| {}).unwrap();
 assert!(result.is_none());
 }

 #[test]
 fn an_empty_candle_set_is_rejected() {
 let config = BacktestConfig::new("BTCUSDT", "1m", dec!(10000));
 let mut engine = BacktestEngine::new(config, Box::new(BuyOnceStrategy { placed: false }));
 let err = engine.run(Vec::new(), Arc::new(AtomicBool::new(false)), |_| {});
 assert!(matches!(err, Err(BacktestError::EmptyCandleSet)));
 }

 #[test]
 fn running_the_same_seed_twice_yields_byte_identical_equity_curves() {
 let candles = vec![
 candle(0, dec!(100), dec!(101), dec!(99), dec!(100)),
 candle(1, dec!(100), dec!(120), dec!(99), dec!(101)),
 candle(2, dec!(101), dec!(103), dec!(80), dec!(102)),
 ];
 let run_once = || {
 let mut config = BacktestConfig::new("BTCUSDT", "1m", dec!(10000));
 config.slippage = SlippageModel::Random { bound_pct: dec!(0.01) };
 config.commission = CommissionModel::Percentage(dec!(0.001));
 config.seed = 99;
 let mut engine = BacktestEngine::new(config, Box::new(BuyOnceStrategy { placed: false }));
 engine.run(candles.clone(), Arc::new(AtomicBool::new(false)), |_| {}).unwrap().unwrap()
 };
 let first = run_once();
 let second = run_once();
 let first_equities: Vec<Decimal> = first.equity_curve.iter().map(|p| p.equity).collect();
 let second_equities: Vec<Decimal> = second.equity_curve.iter().map(|p| p.equity).collect();
 assert_eq!(first_equities, second_equities);
 }
}
