use crate::limit::{RiskLimitCatalog, RiskLimitKind, RiskScope};
use crate::metrics::RiskMetricsSnapshot;
use rust_decimal::Decimal;

const EXPOSURE_WEIGHT: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
const LEVERAGE_WEIGHT: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
const VOLATILITY_WEIGHT: Decimal = Decimal::from_parts(20, 0, 0, false, 2);
const DRAWDOWN_WEIGHT: Decimal = Decimal::from_parts(30, 0, 0, false, 2);

fn clamp_unit(value: Decimal) -> Decimal {
 value.clamp(Decimal::ZERO, Decimal::ONE)
}

fn fraction_of_breach(value: Decimal, limits: &RiskLimitCatalog, kind: RiskLimitKind, scope: &RiskScope) -> Decimal {
 match limits.for_kind(kind, scope, None) {
 Some(limit) if !limit.breach.is_zero() => clamp_unit(value / limit.breach),
 _ => Decimal::ZERO,
 }
}

/// Exports the 0-100 risk score for dashboards: a weighted sum of normalized metric
/// ratios, each clamped to `[0, 1]` before weighting so a single blown-out metric cannot push
/// the score past what its weight allows.
pub fn risk_score( snapshot: &RiskMetricsSnapshot,
 limits: &RiskLimitCatalog,
 scope: &RiskScope,
 current_volatility: Decimal,
 baseline_volatility: Decimal,
) -> Decimal {
 let exposure_fraction = fraction_of_breach(snapshot.aggregate_exposure, limits, RiskLimitKind::AggregateExposure, scope);
 let leverage_fraction = fraction_of_breach(snapshot.leverage, limits, RiskLimitKind::Leverage, scope);
 let drawdown_fraction = fraction_of_breach(snapshot.drawdown, limits, RiskLimitKind::Drawdown, scope);
 let volatility_fraction = if baseline_volatility.is_zero() {
 Decimal::ZERO
 } else {
 clamp_unit(current_volatility / baseline_volatility)
 };

 let weighted = EXPOSURE_WEIGHT * exposure_fraction
 + LEVERAGE_WEIGHT * leverage_fraction
 + VOLATILITY_WEIGHT * volatility_fraction
 + DRAWDOWN_WEIGHT * drawdown_fraction;

 (weighted * Decimal::from(100)).round_dp(2)
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::limit::RiskLimit;
 use rust_decimal_macros::dec;
 use std::collections::HashMap;

 fn snapshot(aggregate_exposure: Decimal, leverage: Decimal, drawdown: Decimal) -> RiskMetricsSnapshot {
 RiskMetricsSnapshot {
 equity: dec!(10000),
 exposure_by_symbol: HashMap::new(),
 aggregate_exposure,
 leverage,
 margin_level: dec!(1),
 day_to_date_pnl: Decimal::ZERO,
 drawdown,
 open_position_count: 1,
 }
 }

 #[test]
 fn score_is_zero_when_every_metric_is_well_within_limits() {
 let catalog = RiskLimitCatalog::new()
 .with_limit(RiskLimit::new(RiskLimitKind::AggregateExposure, RiskScope::User, dec!(50000), dec!(80000), dec!(100000)))
 .with_limit(RiskLimit::new(RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10)))
 .with_limit(RiskLimit::new(RiskLimitKind::Drawdown, RiskScope::User, dec!(0.1), dec!(0.2), dec!(0.3)));

 let score = risk_score(&snapshot(dec!(1000), dec!(1), dec!(0.01)), &catalog, &RiskScope::User, dec!(0.01), dec!(0.02));
 assert!(score < dec!(10), "expected a low score, got {score}");
 }

 #[test]
 fn score_saturates_at_100_when_every_metric_is_at_or_past_breach() {
 let catalog = RiskLimitCatalog::new()
 .with_limit(RiskLimit::new(RiskLimitKind::AggregateExposure, RiskScope::User, dec!(50000), dec!(80000), dec!(100000)))
 .with_limit(RiskLimit::new(RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10)))
 .with_limit(RiskLimit::new(RiskLimitKind::Drawdown, RiskScope::User, dec!(0.1), dec!(0.2), dec!(0.3)));

 let score = risk_score(&snapshot(dec!(200000), dec!(20), dec!(0.9)), &catalog, &RiskScope::User, dec!(1), dec!(0.01));
 assert_eq!(score, dec!(100.00));
 }
}
