//! Grid strategy: "maintains a ladder of reduce-on-tp limit orders; on fill, posts
//! the opposite-side grid." The source documentation was ambiguous about whether a buy fill's
//! reverse post lands at the next grid level above or at the same level; this implementation
//! takes the next-grid-above convention.

use crate::model::GridParams;
use crate::strategy::{Strategy, StrategyAction, TickEvent};
use ferrotrade_exchange::model::{OrderType, Side, TimeInForce};
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_execution::state_machine::OrderStatus;
use ferrotrade_integration::Id;
use ferrotrade_portfolio::Position;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct GridStrategy {
 symbol: String,
 params: GridParams,
 levels: Vec<Decimal>,
 /// Order id -> the level index it rests at and which side it was placed as.
 resting: HashMap<Id, (usize, Side)>,
 initialized: bool,
}

impl GridStrategy {
 pub fn new(symbol: String, params: GridParams) -> Self {
 let levels = Self::compute_levels(&params);
 Self { symbol, params, levels, resting: HashMap::new(), initialized: false }
 }

 fn compute_levels(params: &GridParams) -> Vec<Decimal> {
 let span = params.upper_price - params.lower_price;
 let step = span / Decimal::from(params.grid_count);
 (0..=params.grid_count).map(|i| params.lower_price + step * Decimal::from(i)).collect()
 }

 fn spacing(&self) -> Decimal {
 if self.levels.len() < 2 {
 return Decimal::ONE;
 }
 self.levels[1] - self.levels[0]
 }

 /// Finds the grid level nearest `price`, within half a grid's spacing — exact equality
 /// would be fragile once the Order Router has normalized the price against the symbol's
 /// tick size.
 fn nearest_level(&self, price: Decimal) -> Option<usize> {
 let half_spacing = self.spacing() / Decimal::from(2);
 self.levels
 .iter()
 .enumerate()
 .map(|(i, level)| (i, (price - level).abs()))
 .filter(|(_, diff)| *diff <= half_spacing)
 .min_by_key(|(_, diff)| *diff)
 .map(|(i, _)| i)
 }

 fn limit_order(&self, side: Side, price: Decimal) -> NewOrderRequest {
 NewOrderRequest {
 symbol: self.symbol.clone(),
 side,
 order_type: OrderType::Limit,
 time_in_force: Some(TimeInForce::GoodTilCanceled),
 quantity: self.params.quantity_per_grid,
 price: Some(price),
 reduce_only: false,
 reference_price: price,
 }
 }
}

impl Strategy for GridStrategy {
 fn on_tick(&mut self, event: &TickEvent) -> Vec<StrategyAction> {
 let TickEvent::Market(tick) = event else { return Vec::new() };
 if self.initialized || tick.symbol != self.symbol {
 return Vec::new();
 }
 self.initialized = true;

 self.levels
 .iter()
 .filter(|&&level| level < tick.price)
 .map(|&level| StrategyAction::PlaceOrder(self.limit_order(Side::Buy, level)))
 .collect()
 }

 fn on_order_update(&mut self, order: &Order) -> Vec<StrategyAction> {
 if order.symbol != self.symbol {
 return Vec::new();
 }

 let Some(price) = order.price else { return Vec::new() };

 let level = match self.resting.get(&order.id) {
 Some(&(level, _)) => level,
 None => match self.nearest_level(price) {
 Some(level) => {
 self.resting.insert(order.id, (level, order.side));
 level
 }
 None => return Vec::new(),
 },
 };

 if !order.status.is_terminal() {
 return Vec::new();
 }
 self.resting.remove(&order.id);

 if order.status != OrderStatus::Filled {
 return Vec::new();
 }

 match order.side {
 // A buy fill posts the opposite-side grid at the next level above (this spec's
 // chosen convention); a sell fill re-posts a buy back at the level it closed from.
 Side::Buy => {
 let Some(&next_level) = self.levels.get(level + 1) else { return Vec::new() };
 vec![StrategyAction::PlaceOrder(self.limit_order(Side::Sell, next_level))]
 }
 Side::Sell => {
 let Some(&this_level) = self.levels.get(level) else { return Vec::new() };
 vec![StrategyAction::PlaceOrder(self.limit_order(Side::Buy, this_level))]
 }
 }
 }

 fn on_position_update(&mut self, _position: &Position) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn checkpoint(&self) -> serde_json::Value {
 let resting: Vec<(String, usize, bool)> = self
 .resting
 .iter()
 .map(|(id, (level, side))| (id.to_string(), *level, matches!(side, Side::Buy)))
 .collect();
 serde_json::json!({ "initialized": self.initialized, "resting": resting })
 }

 fn restore(&mut self, state: serde_json::Value) {
 if let Some(initialized) = state.get("initialized").and_then(|v| v.as_bool()) {
 self.initialized = initialized;
 }
 if let Some(resting) = state.get("resting").and_then(|v| v.as_array()) {
 self.resting = resting
 .iter()
 .filter_map(|entry| {
 let entry = entry.as_array()?;
 let id: Id = entry.first()?.as_str()?.parse().ok()?;
 let level = entry.get(1)?.as_u64()? as usize;
 let is_buy = entry.get(2)?.as_bool()?;
 Some((id, (level, if is_buy { Side::Buy } else { Side::Sell })))
 })
 .collect();
 }
 }
}
