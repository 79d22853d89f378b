use crate::{asset::AssetName, error::InstrumentError, exchange::ExchangeId};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`Symbol`] on its venue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SymbolStatus {
 Trading,
 Halted,
 Delisted,
}

/// Static reference data for one tradable instrument on one venue: the numeric-precision
/// authority every price/quantity the Order Router accepts is normalized against before it
/// reaches the Exchange Adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Constructor)]
pub struct Symbol {
 pub venue: ExchangeId,
 pub base: AssetName,
 pub quote: AssetName,
 pub tick_size: Decimal,
 pub lot_size: Decimal,
 pub min_notional: Decimal,
 pub price_precision: u32,
 pub quantity_precision: u32,
 pub status: SymbolStatus,
}

impl Symbol {
 /// Rounds `price` down to the nearest multiple of `tick_size`, the direction prescribed by
 /// venues that reject unaligned prices rather than silently rounding themselves.
 pub fn normalize_price(&self, price: Decimal) -> Decimal {
 round_down_to_increment(price, self.tick_size)
 }

 /// Rounds `quantity` down to the nearest multiple of `lot_size`.
 pub fn normalize_quantity(&self, quantity: Decimal) -> Decimal {
 round_down_to_increment(quantity, self.lot_size)
 }

 /// Normalizes both `price` and `quantity` and validates the resulting notional against
 /// `min_notional`, per the Order Router's pre-trade "Normalize" step (step 1).
 /// Rejects symbols that are not currently `Trading`.
 pub fn normalize_order( &self,
 price: Decimal,
 quantity: Decimal,
) -> Result<(Decimal, Decimal), InstrumentError> {
 if self.status != SymbolStatus::Trading {
 return Err(InstrumentError::NotTrading {
 venue: self.venue.to_string(),
 base: self.base.to_string(),
 quote: self.quote.to_string(),
 status: self.status,
 });
 }

 let price = self.normalize_price(price);
 let quantity = self.normalize_quantity(quantity);

 if quantity < self.lot_size {
 return Err(InstrumentError::BelowLotSize {
 quantity,
 lot_size: self.lot_size,
 });
 }

 let notional = price * quantity;
 if notional < self.min_notional {
 return Err(InstrumentError::BelowMinNotional {
 notional,
 min_notional: self.min_notional,
 });
 }

 Ok((price, quantity))
 }
}

/// Rounds `value` down to the nearest non-negative multiple of `increment`. An `increment` of
/// zero is treated as "no constraint" and returns `value` unchanged, matching venues that report
/// a zero tick/lot size for instruments with no minimum granularity.
fn round_down_to_increment(value: Decimal, increment: Decimal) -> Decimal {
 if increment.is_zero() {
 return value;
 }
 (value / increment).floor() * increment
}

#[cfg(test)]
mod tests {
 use super::*;
 use rust_decimal_macros::dec;

 fn btcusdt_perp() -> Symbol {
 Symbol::new( ExchangeId::BinanceUsdFutures,
 AssetName::new("BTC"),
 AssetName::new("USDT"),
 dec!(0.10),
 dec!(0.001),
 dec!(5),
 1,
 3,
 SymbolStatus::Trading,
)
 }

 #[test]
 fn normalize_price_floors_to_tick_size() {
 let symbol = btcusdt_perp();
 assert_eq!(symbol.normalize_price(dec!(50000.07)), dec!(50000.00));
 assert_eq!(symbol.normalize_price(dec!(50000.19)), dec!(50000.10));
 }

 #[test]
 fn quantity_at_exactly_lot_size_is_accepted() {
 let symbol = btcusdt_perp();
 let (_, quantity) = symbol
 .normalize_order(dec!(50000), dec!(0.001))
 .expect("exact lot size must be accepted");
 assert_eq!(quantity, dec!(0.001));
 }

 #[test]
 fn quantity_below_lot_size_is_rejected() {
 let symbol = btcusdt_perp();
 let err = symbol.normalize_order(dec!(50000), dec!(0.0005)).unwrap_err();
 assert!(matches!(err, InstrumentError::BelowLotSize { .. }));
 }

 #[test]
 fn notional_at_exactly_min_notional_is_accepted() {
 let symbol = btcusdt_perp();
 // price 5000.00 * quantity 0.001 == 5.00 == min_notional exactly.
 let result = symbol.normalize_order(dec!(5000.00), dec!(0.001));
 assert!(result.is_ok());
 }

 #[test]
 fn notional_below_min_notional_is_rejected() {
 let symbol = btcusdt_perp();
 let err = symbol.normalize_order(dec!(1000.00), dec!(0.001)).unwrap_err();
 assert!(matches!(err, InstrumentError::BelowMinNotional { .. }));
 }

 #[test]
 fn halted_symbol_rejects_any_order() {
 let mut symbol = btcusdt_perp();
 symbol.status = SymbolStatus::Halted;
 let err = symbol.normalize_order(dec!(50000), dec!(1)).unwrap_err();
 assert!(matches!(err, InstrumentError::NotTrading { .. }));
 }
}
