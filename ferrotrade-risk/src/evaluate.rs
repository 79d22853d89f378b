use crate::limit::{RiskLimit, RiskLimitCatalog, RiskLimitKind, RiskScope};
use crate::metrics::RiskMetricsSnapshot;
use ferrotrade_exchange::model::{PlaceOrderRequest, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of `evaluate_new_order`: `Allowed` passes through untouched, `Warning`
/// is permitted but audited, `Violation` blocks the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderRiskDecision {
 Allowed,
 Warning { limits: Vec<RiskLimitKind> },
 Violation { limit: RiskLimitKind },
}

fn projected_notional(order: &PlaceOrderRequest, mark_price: Decimal) -> Decimal {
 let price = order.price.unwrap_or(mark_price);
 price * order.quantity
}

fn projected_symbol_exposure(snapshot: &RiskMetricsSnapshot, order: &PlaceOrderRequest, mark_price: Decimal) -> Decimal {
 let delta = projected_notional(order, mark_price);
 let current = snapshot.exposure_for(&order.symbol);
 match order.side {
 // A reduce-only order shrinks exposure; a position-increasing order grows it. Both
 // directions of a non-reduce-only order are treated as additive since netted hedges
 // are rare for a perpetuals-only venue and the conservative bound is the safer default.
 Side::Buy | Side::Sell if order.reduce_only => (current - delta).max(Decimal::ZERO),
 _ => current + delta,
 }
}

fn projected_aggregate_exposure(snapshot: &RiskMetricsSnapshot, order: &PlaceOrderRequest, mark_price: Decimal) -> Decimal {
 let delta = projected_notional(order, mark_price);
 if order.reduce_only {
 (snapshot.aggregate_exposure - delta).max(Decimal::ZERO)
 } else {
 snapshot.aggregate_exposure + delta
 }
}

fn projected_leverage(aggregate_exposure: Decimal, equity: Decimal) -> Decimal {
 if equity.is_sign_positive() && !equity.is_zero() {
 aggregate_exposure / equity
 } else {
 Decimal::MAX
 }
}

fn classify(projected: Decimal, limit: &RiskLimit) -> Option<(RiskLimitKind, bool)> {
 if projected >= limit.breach {
 Some((limit.kind, true))
 } else if projected >= limit.critical {
 Some((limit.kind, false))
 } else {
 None
 }
}

/// Pre-trade synchronous check (`evaluateNewOrder`): projects the order's effect on
/// exposure and leverage, compares against every limit applicable to `scope` and the order's
/// symbol, and returns the worst outcome found. A limit breached at or above `breach` is a
/// `Violation` and short-circuits further checks (the caller should stop there); a limit at or
/// above `critical` but under `breach` is a `Warning`, permitted but collected for the audit
/// trail; anything below `critical` (including past `warning`) passes silently, since only the
/// continuous sweep acts on the soft `warning` threshold.
pub fn evaluate_new_order( order: &PlaceOrderRequest,
 snapshot: &RiskMetricsSnapshot,
 mark_price: Decimal,
 limits: &RiskLimitCatalog,
 scope: &RiskScope,
) -> OrderRiskDecision {
 let projected_symbol_exposure = projected_symbol_exposure(snapshot, order, mark_price);
 let projected_aggregate_exposure = projected_aggregate_exposure(snapshot, order, mark_price);
 let projected_leverage = projected_leverage(projected_aggregate_exposure, snapshot.equity);

 let mut warnings = Vec::new();

 for limit in limits.matching(scope, Some(&order.symbol)) {
 let projected = match limit.kind {
 RiskLimitKind::SymbolExposure => projected_symbol_exposure,
 RiskLimitKind::AggregateExposure => projected_aggregate_exposure,
 RiskLimitKind::Leverage => projected_leverage,
 RiskLimitKind::OpenPositionCount => Decimal::from(snapshot.open_position_count as u64),
 RiskLimitKind::MarginLevel | RiskLimitKind::MaxDailyLoss | RiskLimitKind::Drawdown => continue,
 };

 match classify(projected, limit) {
 Some((kind, true)) => return OrderRiskDecision::Violation { limit: kind },
 Some((kind, false)) => warnings.push(kind),
 None => {}
 }
 }

 if warnings.is_empty() {
 OrderRiskDecision::Allowed
 } else {
 OrderRiskDecision::Warning { limits: warnings }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use ferrotrade_exchange::model::{OrderType, TimeInForce};
 use rust_decimal_macros::dec;
 use std::collections::HashMap;

 fn order(symbol: &str, quantity: Decimal, reduce_only: bool) -> PlaceOrderRequest {
 PlaceOrderRequest {
 client_order_id: "c1".to_string(),
 symbol: symbol.to_string(),
 side: Side::Buy,
 order_type: OrderType::Market,
 time_in_force: Some(TimeInForce::GoodTilCanceled),
 quantity,
 price: None,
 reduce_only,
 }
 }

 fn snapshot(equity: Decimal, aggregate_exposure: Decimal) -> RiskMetricsSnapshot {
 RiskMetricsSnapshot {
 equity,
 exposure_by_symbol: HashMap::new(),
 aggregate_exposure,
 leverage: if equity.is_zero() { Decimal::ZERO } else { aggregate_exposure / equity },
 margin_level: dec!(1),
 day_to_date_pnl: Decimal::ZERO,
 drawdown: Decimal::ZERO,
 open_position_count: 0,
 }
 }

 #[test]
 fn an_order_within_every_limit_is_allowed() {
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let decision = evaluate_new_order(&order("BTCUSDT", dec!(0.1), false), &snapshot(dec!(10000), dec!(0)), dec!(50000), &catalog, &RiskScope::User);
 assert_eq!(decision, OrderRiskDecision::Allowed);
 }

 #[test]
 fn an_order_projected_past_breach_is_a_violation() {
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let decision = evaluate_new_order(&order("BTCUSDT", dec!(3), false), &snapshot(dec!(10000), dec!(0)), dec!(50000), &catalog, &RiskScope::User);
 assert_eq!(decision, OrderRiskDecision::Violation { limit: RiskLimitKind::Leverage });
 }

 #[test]
 fn an_order_projected_past_critical_but_under_breach_is_a_warning() {
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let decision = evaluate_new_order(&order("BTCUSDT", dec!(1.7), false), &snapshot(dec!(10000), dec!(0)), dec!(50000), &catalog, &RiskScope::User);
 assert_eq!(decision, OrderRiskDecision::Warning { limits: vec![RiskLimitKind::Leverage] });
 }

 #[test]
 fn a_reduce_only_order_shrinks_projected_exposure_instead_of_growing_it() {
 let catalog = RiskLimitCatalog::new().with_limit( RiskLimit::new(RiskLimitKind::AggregateExposure, RiskScope::User, dec!(5000), dec!(8000), dec!(10000)),
);
 let decision = evaluate_new_order(&order("BTCUSDT", dec!(0.1), true), &snapshot(dec!(10000), dec!(9000)), dec!(50000), &catalog, &RiskScope::User);
 assert_eq!(decision, OrderRiskDecision::Allowed, "closing exposure should never trip an exposure limit");
 }
}
