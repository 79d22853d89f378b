//! The simulated broker (step 3): holds pending orders between candles and fills them
//! against the next candle(s) the way the Order Router's venue adapter would, minus the network.
//!
//! Fill rules: market orders fill at the open of the candle *after* the one they were placed on
//! (the placing candle's close is already known to the strategy; the next bar's open is the
//! first price the order could actually have traded at). Limit orders sit in the book and fill
//! the first candle whose high/low range crosses the limit price — a buy limit fills once the
//! low touches or drops through it, a sell limit once the high touches or rises through it.
//! Partial fills are not simulated: a crossed limit fills its full remaining quantity in one
//! step. `ferrotrade_exchange::model::OrderType` has no stop variant, so stop orders from the
//! broader spec surface are out of scope here; see `DESIGN.md`.

use crate::commission::CommissionModel;
use crate::model::Candle;
use crate::slippage::SlippageModel;
use ferrotrade_exchange::model::{OrderType, Side};
use ferrotrade_integration::Id;
use rand::rngs::StdRng;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct PendingOrder {
 pub id: Id,
 pub side: Side,
 pub order_type: OrderType,
 pub price: Option<Decimal>,
 pub quantity: Decimal,
 pub reduce_only: bool,
}

/// One fill the broker produced, ready to be applied to the run's [`crate::engine`] position
/// and fed back to the strategy as an order update.
#[derive(Debug, Clone)]
pub struct SimulatedFill {
 pub order_id: Id,
 pub side: Side,
 pub price: Decimal,
 pub quantity: Decimal,
 pub commission: Decimal,
 pub reduce_only: bool,
}

pub struct SimulatedBroker {
 commission: CommissionModel,
 slippage: SlippageModel,
 pending_limits: Vec<PendingOrder>,
 cumulative_notional: Decimal,
}

impl SimulatedBroker {
 pub fn new(commission: CommissionModel, slippage: SlippageModel) -> Self {
 Self {
 commission,
 slippage,
 pending_limits: Vec::new(),
 cumulative_notional: Decimal::ZERO,
 }
 }

 /// Accepts a newly placed order. Market orders fill immediately against `fill_candle` (the
 /// candle following the one that produced the action, or `None` at the end of the series, in
 /// which case the current candle's close stands in). Limit orders are evaluated against
 /// `current_candle`'s own range before being carried over to subsequent candles.
 pub fn submit( &mut self,
 order: PendingOrder,
 current_candle: &Candle,
 fill_candle: Option<&Candle>,
 rng: &mut StdRng,
) -> Option<SimulatedFill> {
 match order.order_type {
 OrderType::Market => {
 let candle = fill_candle.unwrap_or(current_candle);
 let price = if fill_candle.is_some() { candle.open } else { candle.close };
 Some(self.execute(&order, price, candle.volume, rng))
 }
 OrderType::Limit => {
 if let Some(fill) = self.try_cross(&order, current_candle, rng) {
 Some(fill)
 } else {
 self.pending_limits.push(order);
 None
 }
 }
 }
 }

 /// Re-evaluates the resting limit book against one more candle (step 3, "advance
 /// the simulated broker one step"). Returns every fill produced this step.
 pub fn advance(&mut self, candle: &Candle, rng: &mut StdRng) -> Vec<SimulatedFill> {
 let mut filled = Vec::new();
 let mut still_pending = Vec::new();
 for order in std::mem::take(&mut self.pending_limits) {
 match self.try_cross(&order, candle, rng) {
 Some(fill) => filled.push(fill),
 None => still_pending.push(order),
 }
 }
 self.pending_limits = still_pending;
 filled
 }

 fn try_cross(&mut self, order: &PendingOrder, candle: &Candle, rng: &mut StdRng) -> Option<SimulatedFill> {
 let limit_price = order.price?;
 let crossed = match order.side {
 Side::Buy => candle.low <= limit_price,
 Side::Sell => candle.high >= limit_price,
 };
 if !crossed {
 return None;
 }
 Some(self.execute(order, limit_price, candle.volume, rng))
 }

 fn execute(&mut self, order: &PendingOrder, reference_price: Decimal, candle_volume: Decimal, rng: &mut StdRng) -> SimulatedFill {
 let price = self.slippage.apply(order.side, reference_price, order.quantity, candle_volume, rng);
 let notional = price * order.quantity;
 let commission = self.commission.commission_for(notional, self.cumulative_notional);
 self.cumulative_notional += notional;
 SimulatedFill {
 order_id: order.id,
 side: order.side,
 price,
 quantity: order.quantity,
 commission,
 reduce_only: order.reduce_only,
 }
 }

 pub fn has_pending(&self) -> bool {
 !self.pending_limits.is_empty()
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use chrono::Utc;
 use rand::SeedableRng;
 use rust_decimal_macros::dec;

 fn candle(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
 Candle { open_time: Utc::now(), open, high, low, close, volume: dec!(1000) }
 }

 fn market(side: Side, quantity: Decimal) -> PendingOrder {
 PendingOrder { id: Id::new(), side, order_type: OrderType::Market, price: None, quantity, reduce_only: false }
 }

 fn limit(side: Side, price: Decimal, quantity: Decimal) -> PendingOrder {
 PendingOrder { id: Id::new(), side, order_type: OrderType::Limit, price: Some(price), quantity, reduce_only: false }
 }

 #[test]
 fn market_order_fills_at_next_candle_open() {
 let mut broker = SimulatedBroker::new(CommissionModel::None, SlippageModel::None);
 let this_candle = candle(dec!(100), dec!(105), dec!(95), dec!(102));
 let next_candle = candle(dec!(103), dec!(110), dec!(100), dec!(108));
 let fill = broker
 .submit(market(Side::Buy, dec!(1)), &this_candle, Some(&next_candle), &mut StdRng::seed_from_u64(1))
 .expect("market orders fill immediately");
 assert_eq!(fill.price, dec!(103));
 }

 #[test]
 fn market_order_on_final_candle_fills_at_its_close() {
 let mut broker = SimulatedBroker::new(CommissionModel::None, SlippageModel::None);
 let last_candle = candle(dec!(100), dec!(105), dec!(95), dec!(102));
 let fill = broker
 .submit(market(Side::Buy, dec!(1)), &last_candle, None, &mut StdRng::seed_from_u64(1))
 .expect("falls back to last close");
 assert_eq!(fill.price, dec!(102));
 }

 #[test]
 fn buy_limit_fills_once_the_low_touches_the_price() {
 let mut broker = SimulatedBroker::new(CommissionModel::None, SlippageModel::None);
 let placing_candle = candle(dec!(100), dec!(101), dec!(99), dec!(100));
 let fill = broker.submit(limit(Side::Buy, dec!(90), dec!(1)), &placing_candle, None, &mut StdRng::seed_from_u64(1));
 assert!(fill.is_none(), "not yet crossed");
 assert!(broker.has_pending());

 let dip_candle = candle(dec!(95), dec!(96), dec!(88), dec!(93));
 let fills = broker.advance(&dip_candle, &mut StdRng::seed_from_u64(1));
 assert_eq!(fills.len(), 1);
 assert_eq!(fills[0].price, dec!(90));
 assert!(!broker.has_pending());
 }

 #[test]
 fn sell_limit_fills_once_the_high_touches_the_price() {
 let mut broker = SimulatedBroker::new(CommissionModel::None, SlippageModel::None);
 let placing_candle = candle(dec!(100), dec!(101), dec!(99), dec!(100));
 broker.submit(limit(Side::Sell, dec!(110), dec!(1)), &placing_candle, None, &mut StdRng::seed_from_u64(1));
 let rally_candle = candle(dec!(105), dec!(112), dec!(104), dec!(109));
 let fills = broker.advance(&rally_candle, &mut StdRng::seed_from_u64(1));
 assert_eq!(fills.len(), 1);
 assert_eq!(fills[0].price, dec!(110));
 }

 #[test]
 fn limit_order_crossed_on_its_own_placing_candle_fills_immediately() {
 let mut broker = SimulatedBroker::new(CommissionModel::None, SlippageModel::None);
 let placing_candle = candle(dec!(100), dec!(101), dec!(89), dec!(95));
 let fill = broker.submit(limit(Side::Buy, dec!(90), dec!(1)), &placing_candle, None, &mut StdRng::seed_from_u64(1));
 assert!(fill.is_some());
 assert!(!broker.has_pending());
 }

 #[test]
 fn commission_is_charged_on_notional() {
 let mut broker = SimulatedBroker::new(CommissionModel::Percentage(dec!(0.001)), SlippageModel::None);
 let this_candle = candle(dec!(100), dec!(105), dec!(95), dec!(102));
 let next_candle = candle(dec!(100), dec!(110), dec!(100), dec!(108));
 let fill = broker
 .submit(market(Side::Buy, dec!(2)), &this_candle, Some(&next_candle), &mut StdRng::seed_from_u64(1))
 .unwrap();
 assert_eq!(fill.commission, dec!(0.2));
 }
}
