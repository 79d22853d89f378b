//! Momentum strategy: signals on a fast moving average crossing a slow one, going
//! long on an upward cross and flattening on a downward cross.

use crate::model::MomentumParams;
use crate::strategy::{Strategy, StrategyAction, TickEvent};
use crate::ta::SimpleMovingAverage;
use ferrotrade_exchange::model::{OrderType, Side};
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_portfolio::{Position, PositionSide};
use rust_decimal::Decimal;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum CrossState {
 Unknown,
 FastAbove,
 FastBelow,
}

pub struct MomentumStrategy {
 symbol: String,
 params: MomentumParams,
 fast: SimpleMovingAverage,
 slow: SimpleMovingAverage,
 cross: CrossState,
 in_position: bool,
}

impl MomentumStrategy {
 pub fn new(symbol: String, params: MomentumParams) -> Self {
 let fast = SimpleMovingAverage::new(params.fast_period);
 let slow = SimpleMovingAverage::new(params.slow_period);
 Self { symbol, params, fast, slow, cross: CrossState::Unknown, in_position: false }
 }

 fn market_order(&self, side: Side, price: Decimal) -> NewOrderRequest {
 NewOrderRequest {
 symbol: self.symbol.clone(),
 side,
 order_type: OrderType::Market,
 time_in_force: None,
 quantity: self.params.notional / price,
 price: None,
 reduce_only: side == Side::Sell,
 reference_price: price,
 }
 }
}

impl Strategy for MomentumStrategy {
 fn on_tick(&mut self, event: &TickEvent) -> Vec<StrategyAction> {
 let TickEvent::Market(tick) = event else { return Vec::new() };
 if tick.symbol != self.symbol {
 return Vec::new();
 }

 let fast = self.fast.update(tick.price);
 let slow = self.slow.update(tick.price);
 if !self.fast.is_ready() || !self.slow.is_ready() {
 return Vec::new();
 }

 let current = if fast > slow { CrossState::FastAbove } else { CrossState::FastBelow };
 let previous = self.cross;
 self.cross = current;

 match (previous, current) {
 (CrossState::FastBelow, CrossState::FastAbove) if !self.in_position => {
 self.in_position = true;
 vec![StrategyAction::PlaceOrder(self.market_order(Side::Buy, tick.price))]
 }
 (CrossState::FastAbove, CrossState::FastBelow) if self.in_position => {
 self.in_position = false;
 vec![StrategyAction::PlaceOrder(self.market_order(Side::Sell, tick.price))]
 }
 _ => Vec::new(),
 }
 }

 fn on_order_update(&mut self, _order: &Order) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn on_position_update(&mut self, position: &Position) -> Vec<StrategyAction> {
 if position.symbol != self.symbol {
 return Vec::new();
 }
 self.in_position = !position.is_flat() && position.side == PositionSide::Long;
 Vec::new()
 }

 fn checkpoint(&self) -> serde_json::Value {
 serde_json::json!({ "in_position": self.in_position })
 }

 fn restore(&mut self, state: serde_json::Value) {
 if let Some(in_position) = state.get("in_position").and_then(|v| v.as_bool()) {
 self.in_position = in_position;
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use chrono::Utc;
 use rust_decimal_macros::dec;

 fn params() -> MomentumParams {
 MomentumParams {
 fast_period: 2,
 slow_period: 3,
 notional: dec!(1000),
 stop_loss_percent: dec!(2),
 take_profit_percent: dec!(4),
 }
 }

 fn market_tick(symbol: &str, price: Decimal) -> TickEvent {
 TickEvent::Market(crate::strategy::MarketTick { symbol: symbol.to_string(), price, event_time: Utc::now() })
 }

 #[test]
 fn an_upward_cross_enters_a_long_position() {
 let mut momentum = MomentumStrategy::new("BTCUSDT".to_string(), params());
 for price in [dec!(100), dec!(100), dec!(100)] {
 assert!(momentum.on_tick(&market_tick("BTCUSDT", price)).is_empty());
 }
 let actions = momentum.on_tick(&market_tick("BTCUSDT", dec!(150)));
 assert_eq!(actions.len(), 1);
 let StrategyAction::PlaceOrder(request) = &actions[0] else { panic!("expected place order") };
 assert_eq!(request.side, Side::Buy);
 }

 #[test]
 fn a_downward_cross_after_entry_flattens() {
 let mut momentum = MomentumStrategy::new("BTCUSDT".to_string(), params());
 for price in [dec!(100), dec!(100), dec!(100), dec!(150)] {
 momentum.on_tick(&market_tick("BTCUSDT", price));
 }
 assert!(momentum.in_position);
 let actions = momentum.on_tick(&market_tick("BTCUSDT", dec!(50)));
 assert_eq!(actions.len(), 1);
 let StrategyAction::PlaceOrder(request) = &actions[0] else { panic!("expected place order") };
 assert_eq!(request.side, Side::Sell);
 }
}
