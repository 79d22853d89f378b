//! Dollar-cost-averaging strategy: buys a fixed notional on its own cadence up to a
//! position cap, and maintains a single take-profit sell sized to the current position.

use crate::model::DcaParams;
use crate::strategy::{Strategy, StrategyAction, TickEvent};
use ferrotrade_exchange::model::{OrderType, Side, TimeInForce};
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_integration::Id;
use ferrotrade_portfolio::{Position, PositionSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DcaState {
 position_notional: Decimal,
 last_price: Option<Decimal>,
 take_profit_order: Option<Id>,
}

pub struct DcaStrategy {
 params: DcaParams,
 state: DcaState,
}

impl DcaStrategy {
 pub fn new(params: DcaParams) -> Self {
 Self { params, state: DcaState::default() }
 }

 fn buy_order(&self, price: Decimal) -> NewOrderRequest {
 let quantity = self.params.notional_per_buy / price;
 NewOrderRequest {
 symbol: self.params.symbol.clone(),
 side: Side::Buy,
 order_type: OrderType::Market,
 time_in_force: None,
 quantity,
 price: None,
 reduce_only: false,
 reference_price: price,
 }
 }

 fn take_profit_order(&self, quantity: Decimal, entry_price: Decimal) -> NewOrderRequest {
 let take_profit_price =
 entry_price * (Decimal::ONE + self.params.take_profit_percent / Decimal::from(100));
 NewOrderRequest {
 symbol: self.params.symbol.clone(),
 side: Side::Sell,
 order_type: OrderType::Limit,
 time_in_force: Some(TimeInForce::GoodTilCanceled),
 quantity,
 price: Some(take_profit_price),
 reduce_only: true,
 reference_price: take_profit_price,
 }
 }
}

impl Strategy for DcaStrategy {
 fn on_tick(&mut self, event: &TickEvent) -> Vec<StrategyAction> {
 match event {
 TickEvent::Market(tick) if tick.symbol == self.params.symbol => {
 self.state.last_price = Some(tick.price);
 Vec::new()
 }
 TickEvent::Timer(_) => {
 let Some(price) = self.state.last_price else { return Vec::new() };
 if self.state.position_notional + self.params.notional_per_buy > self.params.max_position_size {
 return Vec::new();
 }
 vec![StrategyAction::PlaceOrder(self.buy_order(price))]
 }
 _ => Vec::new(),
 }
 }

 fn on_order_update(&mut self, order: &Order) -> Vec<StrategyAction> {
 if order.symbol != self.params.symbol || order.side != Side::Buy || !order.status.is_terminal() {
 return Vec::new();
 }
 if order.filled_quantity.is_zero() {
 return Vec::new();
 }
 self.state.position_notional += order.filled_quantity * order.price.unwrap_or_default();
 Vec::new()
 }

 fn on_position_update(&mut self, position: &Position) -> Vec<StrategyAction> {
 if position.symbol != self.params.symbol || position.side != PositionSide::Long {
 return Vec::new();
 }
 self.state.position_notional = position.notional;

 if self.state.take_profit_order.is_some() || position.is_flat() {
 return Vec::new();
 }
 self.state.take_profit_order = Some(Id::new());
 vec![StrategyAction::PlaceOrder(self.take_profit_order(position.quantity, position.entry_price))]
 }

 fn checkpoint(&self) -> serde_json::Value {
 serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null)
 }

 fn restore(&mut self, state: serde_json::Value) {
 if let Ok(state) = serde_json::from_value(state) {
 self.state = state;
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use chrono::Utc;
 use rust_decimal_macros::dec;

 fn params() -> DcaParams {
 DcaParams {
 symbol: "BTCUSDT".to_string(),
 interval_seconds: 3600,
 notional_per_buy: dec!(100),
 max_position_size: dec!(500),
 take_profit_percent: dec!(5),
 }
 }

 #[test]
 fn timer_tick_buys_at_the_last_observed_price() {
 let mut dca = DcaStrategy::new(params());
 dca.on_tick(&TickEvent::Market(crate::strategy::MarketTick {
 symbol: "BTCUSDT".to_string(),
 price: dec!(50000),
 event_time: Utc::now(),
 }));
 let actions = dca.on_tick(&TickEvent::Timer(Utc::now()));
 assert_eq!(actions.len(), 1);
 let StrategyAction::PlaceOrder(request) = &actions[0] else { panic!("expected place order") };
 assert_eq!(request.side, Side::Buy);
 assert_eq!(request.quantity, dec!(100) / dec!(50000));
 }

 #[test]
 fn timer_tick_is_skipped_without_a_price_observation_yet() {
 let mut dca = DcaStrategy::new(params());
 assert!(dca.on_tick(&TickEvent::Timer(Utc::now())).is_empty());
 }

 #[test]
 fn buying_past_the_position_cap_is_skipped() {
 let mut dca = DcaStrategy::new(params());
 dca.state.position_notional = dec!(450);
 dca.on_tick(&TickEvent::Market(crate::strategy::MarketTick {
 symbol: "BTCUSDT".to_string(),
 price: dec!(50000),
 event_time: Utc::now(),
 }));
 assert!(dca.on_tick(&TickEvent::Timer(Utc::now())).is_empty());
 }
}
