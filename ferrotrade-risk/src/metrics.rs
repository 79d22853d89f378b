use chrono::{NaiveDate, Utc};
use ferrotrade_instrument::AssetName;
use ferrotrade_integration::Id;
use ferrotrade_portfolio::{BalanceSheet, Position};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A point-in-time view of the metrics the Risk Engine checks limits against:
/// per-symbol and aggregate notional exposure, leverage, margin level, day-to-date P&L,
/// drawdown from peak equity, and open-position count.
#[derive(Debug, Clone)]
pub struct RiskMetricsSnapshot {
 pub equity: Decimal,
 pub exposure_by_symbol: HashMap<String, Decimal>,
 pub aggregate_exposure: Decimal,
 pub leverage: Decimal,
 pub margin_level: Decimal,
 pub day_to_date_pnl: Decimal,
 pub drawdown: Decimal,
 pub open_position_count: usize,
}

impl RiskMetricsSnapshot {
 pub fn exposure_for(&self, symbol: &str) -> Decimal {
 self.exposure_by_symbol.get(symbol).copied().unwrap_or(Decimal::ZERO)
 }
}

/// Maintains the running state needed to derive drawdown and day-to-date P&L — both require a
/// baseline (peak equity, start-of-day equity) that a single snapshot cannot carry.
///
/// Tracks a per-user equity series with an explicit calendar-day reset for the
/// daily-loss baseline.
#[derive(Debug, Default)]
pub struct RiskMetricsTracker {
 peak_equity: HashMap<Id, Decimal>,
 day_baseline: HashMap<Id, (NaiveDate, Decimal)>,
}

impl RiskMetricsTracker {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn compute( &mut self,
 user: Id,
 positions: &[Position],
 balances: &BalanceSheet,
 margin_asset: &AssetName,
) -> RiskMetricsSnapshot {
 let wallet = balances.get(margin_asset).wallet;
 let unrealized_total: Decimal = positions.iter().map(|position| position.unrealized_pnl).sum();
 let equity = wallet + unrealized_total;

 let mut exposure_by_symbol = HashMap::with_capacity(positions.len());
 let mut aggregate_exposure = Decimal::ZERO;
 for position in positions {
 let notional = position.notional.abs();
 *exposure_by_symbol.entry(position.symbol.clone()).or_insert(Decimal::ZERO) += notional;
 aggregate_exposure += notional;
 }

 let leverage = if equity.is_sign_positive() && !equity.is_zero() {
 aggregate_exposure / equity
 } else {
 Decimal::MAX
 };
 let margin_level = if aggregate_exposure.is_zero() {
 Decimal::MAX
 } else {
 equity / aggregate_exposure
 };

 let peak = self.peak_equity.entry(user).or_insert(equity);
 if equity > *peak {
 *peak = equity;
 }
 let drawdown = if peak.is_sign_positive() && !peak.is_zero() {
 ((*peak - equity) / *peak).max(Decimal::ZERO)
 } else {
 Decimal::ZERO
 };

 let today = Utc::now().date_naive();
 let baseline = self
 .day_baseline
 .entry(user)
 .and_modify(|(date, baseline_equity)| {
 if *date != today {
 *date = today;
 *baseline_equity = equity;
 }
 })
 .or_insert((today, equity));
 let day_to_date_pnl = equity - baseline.1;

 RiskMetricsSnapshot {
 equity,
 exposure_by_symbol,
 aggregate_exposure,
 leverage,
 margin_level,
 day_to_date_pnl,
 drawdown,
 open_position_count: positions.len(),
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use ferrotrade_instrument::ExchangeId;
 use ferrotrade_portfolio::{Fill, Side};
 use rust_decimal_macros::dec;

 fn position(symbol: &str, quantity: Decimal, entry: Decimal, mark: Decimal) -> Position {
 let fill = Fill {
 side: Side::Buy,
 price: entry,
 quantity,
 fee: Decimal::ZERO,
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: 1,
 venue_timestamp: Utc::now(),
 };
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, symbol, &fill).unwrap();
 position.update_mark_price(mark);
 position
 }

 #[test]
 fn leverage_is_aggregate_exposure_over_equity() {
 let mut tracker = RiskMetricsTracker::new();
 let usdt = AssetName::new("USDT");
 let mut balances = BalanceSheet::new();
 balances.set(usdt.clone(), ferrotrade_portfolio::AssetBalance { wallet: dec!(10000), available: dec!(10000) });
 let positions = vec![position("BTCUSDT", dec!(1), dec!(50000), dec!(50000))];

 let snapshot = tracker.compute(Id::new(), &positions, &balances, &usdt);
 assert_eq!(snapshot.aggregate_exposure, dec!(50000));
 assert_eq!(snapshot.leverage, dec!(5));
 }

 #[test]
 fn drawdown_is_zero_until_equity_falls_below_its_peak() {
 let mut tracker = RiskMetricsTracker::new();
 let usdt = AssetName::new("USDT");
 let user = Id::new();
 let mut balances = BalanceSheet::new();
 balances.set(usdt.clone(), ferrotrade_portfolio::AssetBalance { wallet: dec!(10000), available: dec!(10000) });

 let first = tracker.compute(user, &[], &balances, &usdt);
 assert_eq!(first.drawdown, Decimal::ZERO);

 balances.set(usdt.clone(), ferrotrade_portfolio::AssetBalance { wallet: dec!(9000), available: dec!(9000) });
 let second = tracker.compute(user, &[], &balances, &usdt);
 assert_eq!(second.drawdown, dec!(0.1));
 }
}
