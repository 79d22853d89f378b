use crate::error::PortfolioError;
use chrono::{DateTime, Utc};
use ferrotrade_instrument::AssetName;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
 Buy,
 Sell,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
 Long,
 Short,
}

impl PositionSide {
 fn opened_by(&self, side: Side) -> bool {
 matches!( (self, side),
 (PositionSide::Long, Side::Buy) | (PositionSide::Short, Side::Sell)
)
 }

 fn flipped(&self) -> Self {
 match self {
 PositionSide::Long => PositionSide::Short,
 PositionSide::Short => PositionSide::Long,
 }
 }
}

/// One execution report applied against a [`Position`] (`applyFill`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
 pub side: Side,
 pub price: Decimal,
 pub quantity: Decimal,
 pub fee: Decimal,
 pub fee_asset: AssetName,
 pub venue_trade_id: u64,
 pub venue_timestamp: DateTime<Utc>,
}

/// Emitted when a fill reduces (or flips) an open position, carrying the realized P&L for the
/// reduced portion — the `trade-closed` event of .
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
 pub closed_quantity: Decimal,
 pub exit_price: Decimal,
 pub realized_pnl: Decimal,
}

/// A single-symbol position with a weighted-average entry price: same-side fills
/// widen the position and recompute the average; opposite-side fills realize P&L on the
/// reduced quantity FIFO-equivalently, since a uniform weighted average makes "oldest lot" and
/// "pro-rata of the average" identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
 pub user: ferrotrade_integration::Id,
 pub venue: ferrotrade_instrument::ExchangeId,
 pub symbol: String,
 pub side: PositionSide,
 pub quantity: Decimal,
 pub entry_price: Decimal,
 pub mark_price: Decimal,
 pub unrealized_pnl: Decimal,
 pub realized_pnl: Decimal,
 pub opened_at: DateTime<Utc>,
 pub updated_at: DateTime<Utc>,
 last_trade_id: Option<u64>,
}

impl Position {
 pub fn open( user: ferrotrade_integration::Id,
 venue: ferrotrade_instrument::ExchangeId,
 symbol: impl Into<String>,
 fill: &Fill,
) -> Result<Self, PortfolioError> {
 if !fill.quantity.is_sign_positive() || fill.quantity.is_zero() {
 return Err(PortfolioError::NonPositiveFillQuantity(fill.quantity.to_string()));
 }
 let side = match fill.side {
 Side::Buy => PositionSide::Long,
 Side::Sell => PositionSide::Short,
 };
 Ok(Self {
 user,
 venue,
 symbol: symbol.into(),
 side,
 quantity: fill.quantity,
 entry_price: fill.price,
 mark_price: fill.price,
 unrealized_pnl: Decimal::ZERO,
 realized_pnl: Decimal::ZERO,
 opened_at: fill.venue_timestamp,
 updated_at: fill.venue_timestamp,
 last_trade_id: Some(fill.venue_trade_id),
 })
 }

 pub fn is_flat(&self) -> bool {
 self.quantity.is_zero()
 }

 /// Rebuilds a position wholesale from an authoritative venue snapshot (`syncFromExchange`,
 ///), carrying over any `realized_pnl` already on record.
 #[allow(clippy::too_many_arguments)]
 pub fn from_snapshot( user: ferrotrade_integration::Id,
 venue: ferrotrade_instrument::ExchangeId,
 symbol: impl Into<String>,
 side: PositionSide,
 quantity: Decimal,
 entry_price: Decimal,
 mark_price: Decimal,
 unrealized_pnl: Decimal,
 realized_pnl: Decimal,
) -> Self {
 let now = Utc::now();
 Self {
 user,
 venue,
 symbol: symbol.into(),
 side,
 quantity,
 entry_price,
 mark_price,
 unrealized_pnl,
 realized_pnl,
 opened_at: now,
 updated_at: now,
 last_trade_id: None,
 }
 }

 /// Applies `fill` to this position. Equal `venueTradeId`s are treated as duplicates and
 /// skipped (tie-break rule, reused here since the Portfolio Store consumes the
 /// same fill stream).
 pub fn apply_fill(&mut self, fill: &Fill) -> Result<Option<ClosedTrade>, PortfolioError> {
 if !fill.quantity.is_sign_positive() || fill.quantity.is_zero() {
 return Err(PortfolioError::NonPositiveFillQuantity(fill.quantity.to_string()));
 }
 if self.last_trade_id == Some(fill.venue_trade_id) {
 return Ok(None);
 }
 self.last_trade_id = Some(fill.venue_trade_id);
 self.updated_at = fill.venue_timestamp;

 if self.side.opened_by(fill.side) {
 let total_cost = self.entry_price * self.quantity + fill.price * fill.quantity;
 self.quantity += fill.quantity;
 self.entry_price = total_cost / self.quantity;
 self.recompute_unrealized();
 return Ok(None);
 }

 let reduced_quantity = self.quantity.min(fill.quantity);
 let direction = match self.side {
 PositionSide::Long => Decimal::ONE,
 PositionSide::Short => Decimal::NEGATIVE_ONE,
 };
 let realized_pnl = direction * (fill.price - self.entry_price) * reduced_quantity - fill.fee;
 self.quantity -= reduced_quantity;
 self.realized_pnl += realized_pnl;

 let closed = ClosedTrade {
 closed_quantity: reduced_quantity,
 exit_price: fill.price,
 realized_pnl,
 };

 let remainder = fill.quantity - reduced_quantity;
 if remainder.is_sign_positive() && !remainder.is_zero() {
 // The fill over-closed the position: flip side and open the remainder at this
 // fill's price, same as one order crossing through flat on the venue.
 self.side = self.side.flipped;
 self.quantity = remainder;
 self.entry_price = fill.price;
 self.opened_at = fill.venue_timestamp;
 }

 self.recompute_unrealized();
 Ok(Some(closed))
 }

 /// Recomputes unrealized P&L for the current mark price (`updateMarkPrice`).
 pub fn update_mark_price(&mut self, price: Decimal) {
 self.mark_price = price;
 self.recompute_unrealized();
 }

 fn recompute_unrealized(&mut self) {
 if self.is_flat() {
 self.unrealized_pnl = Decimal::ZERO;
 return;
 }
 let direction = match self.side {
 PositionSide::Long => Decimal::ONE,
 PositionSide::Short => Decimal::NEGATIVE_ONE,
 };
 self.unrealized_pnl = direction * (self.mark_price - self.entry_price) * self.quantity;
 }

 pub fn notional(&self) -> Decimal {
 self.quantity * self.mark_price
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use ferrotrade_instrument::ExchangeId;
 use ferrotrade_integration::Id;
 use rust_decimal_macros::dec;

 fn fill(side: Side, price: Decimal, quantity: Decimal, trade_id: u64) -> Fill {
 Fill {
 side,
 price,
 quantity,
 fee: Decimal::ZERO,
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: trade_id,
 venue_timestamp: Utc::now(),
 }
 }

 #[test]
 fn opening_fill_sets_entry_price_and_side() {
 let position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(1), 1)).unwrap();
 assert_eq!(position.side, PositionSide::Long);
 assert_eq!(position.entry_price, dec!(50000));
 assert_eq!(position.quantity, dec!(1));
 }

 #[test]
 fn same_side_fill_widens_position_with_weighted_average_price() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(1), 1)).unwrap();
 let closed = position.apply_fill(&fill(Side::Buy, dec!(52000), dec!(1), 2)).unwrap();
 assert!(closed.is_none());
 assert_eq!(position.quantity, dec!(2));
 assert_eq!(position.entry_price, dec!(51000));
 }

 #[test]
 fn opposite_side_fill_realizes_pnl_on_reduced_quantity() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(2), 1)).unwrap();
 let closed = position.apply_fill(&fill(Side::Sell, dec!(51000), dec!(1), 2)).unwrap().expect("should realize");
 assert_eq!(closed.realized_pnl, dec!(1000));
 assert_eq!(position.quantity, dec!(1));
 assert_eq!(position.realized_pnl, dec!(1000));
 }

 #[test]
 fn fill_that_overcloses_flips_the_position() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(1), 1)).unwrap();
 position.apply_fill(&fill(Side::Sell, dec!(51000), dec!(3), 2)).unwrap();
 assert_eq!(position.side, PositionSide::Short);
 assert_eq!(position.quantity, dec!(2));
 assert_eq!(position.entry_price, dec!(51000));
 }

 #[test]
 fn duplicate_trade_id_is_skipped() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(1), 1)).unwrap();
 let result = position.apply_fill(&fill(Side::Buy, dec!(99999), dec!(5), 1)).unwrap();
 assert!(result.is_none());
 assert_eq!(position.quantity, dec!(1), "duplicate trade id must be a no-op");
 assert_eq!(position.entry_price, dec!(50000));
 }

 #[test]
 fn update_mark_price_recomputes_unrealized_pnl_for_long() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Buy, dec!(50000), dec!(1), 1)).unwrap();
 position.update_mark_price(dec!(51500));
 assert_eq!(position.unrealized_pnl, dec!(1500));
 }

 #[test]
 fn update_mark_price_recomputes_unrealized_pnl_for_short() {
 let mut position = Position::open(Id::new(), ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill(Side::Sell, dec!(50000), dec!(1), 1)).unwrap();
 position.update_mark_price(dec!(48000));
 assert_eq!(position.unrealized_pnl, dec!(2000));
 }
}
