use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of metric a [`RiskLimit`] bounds, and its current projected/actual value against
/// that bound (exposure, leverage, margin level, daily P&L, drawdown, open-position
/// count).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RiskLimitKind {
 SymbolExposure,
 AggregateExposure,
 Leverage,
 MarginLevel,
 MaxDailyLoss,
 Drawdown,
 OpenPositionCount,
}

/// The scope a limit applies at ("applicable to the order's user (global limits) and
/// to the bot (bot-scoped limits)").
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum RiskScope {
 User,
 Bot(ferrotrade_integration::Id),
}

/// One configured limit: a metric kind, a scope, and the warning/critical/breach thresholds
/// that the continuous sweep transitions through. Pre-trade evaluation only uses
/// `critical` (Warning, audited-but-permitted) and `breach` (Violation, rejected); `warning` is
/// a softer threshold surfaced only by the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimit {
 pub kind: RiskLimitKind,
 pub scope: RiskScope,
 pub symbol: Option<String>,
 pub warning: Decimal,
 pub critical: Decimal,
 pub breach: Decimal,
 pub enabled: bool,
}

impl RiskLimit {
 pub fn new(kind: RiskLimitKind, scope: RiskScope, warning: Decimal, critical: Decimal, breach: Decimal) -> Self {
 Self { kind, scope, symbol: None, warning, critical, breach, enabled: true }
 }

 pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
 self.symbol = Some(symbol.into());
 self
 }

 pub fn applies_to(&self, scope: &RiskScope, symbol: Option<&str>) -> bool {
 self.enabled
 && &self.scope == scope
 && match (&self.symbol, symbol) {
 (Some(limit_symbol), Some(symbol)) => limit_symbol == symbol,
 (Some(_), None) => false,
 (None, _) => true,
 }
 }
}

/// A user's full set of enabled limits, global and bot-scoped, checked together by
/// `evaluate_new_order` and the continuous sweep.
#[derive(Debug, Clone, Default)]
pub struct RiskLimitCatalog {
 limits: Vec<RiskLimit>,
}

impl RiskLimitCatalog {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn with_limit(mut self, limit: RiskLimit) -> Self {
 self.limits.push(limit);
 self
 }

 pub fn push(&mut self, limit: RiskLimit) {
 self.limits.push(limit);
 }

 pub fn matching(&self, scope: &RiskScope, symbol: Option<&str>) -> impl Iterator<Item = &RiskLimit> {
 self.limits.iter().filter(move |limit| limit.applies_to(scope, symbol))
 }

 pub fn for_kind(&self, kind: RiskLimitKind, scope: &RiskScope, symbol: Option<&str>) -> Option<&RiskLimit> {
 self.matching(scope, symbol).find(|limit| limit.kind == kind)
 }

 pub fn is_empty(&self) -> bool {
 self.limits.is_empty()
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use rust_decimal_macros::dec;

 #[test]
 fn a_global_limit_with_no_symbol_applies_to_every_symbol() {
 let limit = RiskLimit::new(RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10));
 assert!(limit.applies_to(&RiskScope::User, Some("BTCUSDT")));
 assert!(limit.applies_to(&RiskScope::User, None));
 }

 #[test]
 fn a_symbol_scoped_limit_does_not_apply_to_other_symbols() {
 let limit = RiskLimit::new(RiskLimitKind::SymbolExposure, RiskScope::User, dec!(1000), dec!(1500), dec!(2000))
 .for_symbol("BTCUSDT");
 assert!(limit.applies_to(&RiskScope::User, Some("BTCUSDT")));
 assert!(!limit.applies_to(&RiskScope::User, Some("ETHUSDT")));
 }
}
