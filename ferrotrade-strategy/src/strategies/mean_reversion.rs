//! Mean-reversion strategy: enters against a rolling z-score extreme and exits once
//! it reverts inside a tighter band.

use crate::model::MeanReversionParams;
use crate::strategy::{Strategy, StrategyAction, TickEvent};
use crate::ta::RollingZScore;
use ferrotrade_exchange::model::{OrderType, Side};
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_portfolio::{Position, PositionSide};
use rust_decimal::Decimal;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Stance {
 Flat,
 Long,
 Short,
}

pub struct MeanReversionStrategy {
 symbol: String,
 params: MeanReversionParams,
 z_score: RollingZScore,
 stance: Stance,
}

impl MeanReversionStrategy {
 pub fn new(symbol: String, params: MeanReversionParams) -> Self {
 let z_score = RollingZScore::new(params.period);
 Self { symbol, params, z_score, stance: Stance::Flat }
 }

 fn order(&self, side: Side, price: Decimal, reduce_only: bool) -> NewOrderRequest {
 NewOrderRequest {
 symbol: self.symbol.clone(),
 side,
 order_type: OrderType::Market,
 time_in_force: None,
 quantity: self.params.notional / price,
 price: None,
 reduce_only,
 reference_price: price,
 }
 }
}

impl Strategy for MeanReversionStrategy {
 fn on_tick(&mut self, event: &TickEvent) -> Vec<StrategyAction> {
 let TickEvent::Market(tick) = event else { return Vec::new() };
 if tick.symbol != self.symbol {
 return Vec::new();
 }

 let Some(z) = self.z_score.update(tick.price) else { return Vec::new() };

 match self.stance {
 Stance::Flat if z <= -self.params.z_score_entry => {
 self.stance = Stance::Long;
 vec![StrategyAction::PlaceOrder(self.order(Side::Buy, tick.price, false))]
 }
 Stance::Flat if z >= self.params.z_score_entry => {
 self.stance = Stance::Short;
 vec![StrategyAction::PlaceOrder(self.order(Side::Sell, tick.price, false))]
 }
 Stance::Long if z >= -self.params.z_score_exit => {
 self.stance = Stance::Flat;
 vec![StrategyAction::PlaceOrder(self.order(Side::Sell, tick.price, true))]
 }
 Stance::Short if z <= self.params.z_score_exit => {
 self.stance = Stance::Flat;
 vec![StrategyAction::PlaceOrder(self.order(Side::Buy, tick.price, true))]
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
 self.stance = if position.is_flat() {
 Stance::Flat
 } else {
 match position.side {
 PositionSide::Long => Stance::Long,
 PositionSide::Short => Stance::Short,
 }
 };
 Vec::new()
 }

 fn checkpoint(&self) -> serde_json::Value {
 let stance = match self.stance {
 Stance::Flat => "flat",
 Stance::Long => "long",
 Stance::Short => "short",
 };
 serde_json::json!({ "stance": stance })
 }

 fn restore(&mut self, state: serde_json::Value) {
 self.stance = match state.get("stance").and_then(|v| v.as_str()) {
 Some("long") => Stance::Long,
 Some("short") => Stance::Short,
 _ => Stance::Flat,
 };
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use chrono::Utc;
 use rust_decimal_macros::dec;

 fn params() -> MeanReversionParams {
 MeanReversionParams { period: 3, z_score_entry: dec!(1.0), z_score_exit: dec!(0.2), notional: dec!(1000) }
 }

 fn tick(price: Decimal) -> TickEvent {
 TickEvent::Market(crate::strategy::MarketTick { symbol: "BTCUSDT".to_string(), price, event_time: Utc::now() })
 }

 #[test]
 fn a_sharp_drop_below_the_rolling_mean_enters_long() {
 let mut strategy = MeanReversionStrategy::new("BTCUSDT".to_string(), params());
 strategy.on_tick(&tick(dec!(100)));
 strategy.on_tick(&tick(dec!(100)));
 let actions = strategy.on_tick(&tick(dec!(50)));
 assert_eq!(actions.len(), 1);
 let StrategyAction::PlaceOrder(request) = &actions[0] else { panic!("expected place order") };
 assert_eq!(request.side, Side::Buy);
 assert_eq!(strategy.stance, Stance::Long);
 }

 #[test]
 fn a_flat_series_never_signals() {
 let mut strategy = MeanReversionStrategy::new("BTCUSDT".to_string(), params());
 for _ in 0..5 {
 assert!(strategy.on_tick(&tick(dec!(100))).is_empty());
 }
 }
}
