//! Slippage models ("slippage: none, fixed amount, percentage of price, volume-based,
//! random within a bound"). Every model pushes the fill price against the filling side: a buy
//! always gets a worse (higher) price, a sell always gets a worse (lower) price, the way real
//! slippage erodes the taker's edge rather than improving it.

use ferrotrade_exchange::model::Side;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SlippageModel {
 None,
 Fixed(Decimal),
 Percentage(Decimal),
 /// Slippage scales linearly with the ratio of order quantity to the candle's volume,
 /// capped at `max_pct` of price for a fill that consumes the whole candle's volume.
 VolumeBased { max_pct: Decimal },
 /// Slippage drawn uniformly from `[0, bound_pct]` of price using a PRNG seeded from
 /// `BacktestConfig::seed`, so repeated runs of the same config are byte-identical.
 Random { bound_pct: Decimal },
}

impl SlippageModel {
 /// Returns the fill price adjusted for slippage. `candle_volume` and `quantity` only matter
 /// to the `VolumeBased` arm; `rng` only matters to the `Random` arm.
 pub fn apply( &self,
 side: Side,
 price: Decimal,
 quantity: Decimal,
 candle_volume: Decimal,
 rng: &mut StdRng,
) -> Decimal {
 let direction = match side {
 Side::Buy => Decimal::ONE,
 Side::Sell => Decimal::NEGATIVE_ONE,
 };
 let offset_pct = match self {
 SlippageModel::None => Decimal::ZERO,
 SlippageModel::Fixed(amount) => {
 if price.is_zero() {
 Decimal::ZERO
 } else {
 return price + direction * *amount;
 }
 }
 SlippageModel::Percentage(pct) => *pct,
 SlippageModel::VolumeBased { max_pct } => {
 if candle_volume.is_zero() {
 *max_pct
 } else {
 (quantity / candle_volume).min(Decimal::ONE) * *max_pct
 }
 }
 SlippageModel::Random { bound_pct } => {
 let draw: f64 = rng.gen_range(0.0..1.0);
 let draw = Decimal::from_f64_retain(draw).unwrap_or(Decimal::ZERO);
 draw * *bound_pct
 }
 };
 price + direction * price * offset_pct
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use rand::SeedableRng;
 use rust_decimal_macros::dec;

 fn rng() -> StdRng {
 StdRng::seed_from_u64(7)
 }

 #[test]
 fn none_model_is_a_no_op() {
 let price = SlippageModel::None.apply(Side::Buy, dec!(100), dec!(1), dec!(1000), &mut rng);
 assert_eq!(price, dec!(100));
 }

 #[test]
 fn fixed_model_pushes_buys_up_and_sells_down() {
 let model = SlippageModel::Fixed(dec!(2));
 assert_eq!(model.apply(Side::Buy, dec!(100), dec!(1), dec!(1000), &mut rng), dec!(102));
 assert_eq!(model.apply(Side::Sell, dec!(100), dec!(1), dec!(1000), &mut rng), dec!(98));
 }

 #[test]
 fn percentage_model_scales_with_price() {
 let model = SlippageModel::Percentage(dec!(0.01));
 assert_eq!(model.apply(Side::Buy, dec!(100), dec!(1), dec!(1000), &mut rng), dec!(101.00));
 }

 #[test]
 fn volume_based_model_caps_at_max_pct_for_full_volume_orders() {
 let model = SlippageModel::VolumeBased { max_pct: dec!(0.02) };
 let price = model.apply(Side::Buy, dec!(100), dec!(1000), dec!(1000), &mut rng);
 assert_eq!(price, dec!(102.00));
 }

 #[test]
 fn random_model_is_deterministic_for_a_fixed_seed() {
 let model = SlippageModel::Random { bound_pct: dec!(0.01) };
 let a = model.apply(Side::Buy, dec!(100), dec!(1), dec!(1000), &mut StdRng::seed_from_u64(42));
 let b = model.apply(Side::Buy, dec!(100), dec!(1), dec!(1000), &mut StdRng::seed_from_u64(42));
 assert_eq!(a, b);
 }
}
