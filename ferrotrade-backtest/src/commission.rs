//! Commission models ("commission: none, fixed per trade, percentage of notional,
//! tiered by volume").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommissionModel {
 None,
 FixedPerTrade(Decimal),
 Percentage(Decimal),
 /// Breakpoints are `(cumulative_volume_threshold, rate)` pairs, sorted ascending by
 /// threshold. The rate applied is that of the highest threshold the running cumulative
 /// filled notional has crossed; `cumulative_notional` is running state the broker carries
 /// across the whole run, the way a venue's 30-day volume tier would.
 Tiered(Vec<(Decimal, Decimal)>),
}

impl CommissionModel {
 /// Commission owed on one fill of `notional` (= `price * quantity`), given the running
 /// `cumulative_notional` filled so far this run (used only by the `Tiered` arm).
 pub fn commission_for(&self, notional: Decimal, cumulative_notional: Decimal) -> Decimal {
 match self {
 CommissionModel::None => Decimal::ZERO,
 CommissionModel::FixedPerTrade(fee) => *fee,
 CommissionModel::Percentage(rate) => notional * *rate,
 CommissionModel::Tiered(tiers) => {
 let rate = tiers
 .iter()
 .filter(|(threshold, _)| cumulative_notional >= *threshold)
 .last
 .map(|(_, rate)| *rate)
 .unwrap_or(Decimal::ZERO);
 notional * rate
 }
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use rust_decimal_macros::dec;

 #[test]
 fn percentage_model_scales_with_notional() {
 let model = CommissionModel::Percentage(dec!(0.001));
 assert_eq!(model.commission_for(dec!(10000), Decimal::ZERO), dec!(10));
 }

 #[test]
 fn fixed_model_ignores_notional() {
 let model = CommissionModel::FixedPerTrade(dec!(5));
 assert_eq!(model.commission_for(dec!(1), Decimal::ZERO), dec!(5));
 assert_eq!(model.commission_for(dec!(1_000_000), Decimal::ZERO), dec!(5));
 }

 #[test]
 fn tiered_model_picks_the_highest_crossed_threshold() {
 let model = CommissionModel::Tiered(vec![
 (Decimal::ZERO, dec!(0.001)),
 (dec!(100_000), dec!(0.0008)),
 (dec!(1_000_000), dec!(0.0005)),
 ]);
 assert_eq!(model.commission_for(dec!(10000), Decimal::ZERO), dec!(10));
 assert_eq!(model.commission_for(dec!(10000), dec!(150_000)), dec!(8));
 assert_eq!(model.commission_for(dec!(10000), dec!(2_000_000)), dec!(5));
 }

 #[test]
 fn tiered_model_with_no_crossed_threshold_charges_nothing() {
 let model = CommissionModel::Tiered(vec![(dec!(100_000), dec!(0.0008))]);
 assert_eq!(model.commission_for(dec!(10000), Decimal::ZERO), Decimal::ZERO);
 }
}
