use crate::alert::{AlertSeverity, AlertSink, RiskAlert};
use crate::limit::{RiskLimit, RiskLimitCatalog, RiskLimitKind, RiskScope};
use crate::metrics::RiskMetricsSnapshot;
use ferrotrade_integration::Id;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Default continuous-sweep interval .
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn classify(value: Decimal, limit: &RiskLimit) -> AlertSeverity {
 if value >= limit.breach {
 AlertSeverity::Breach
 } else if value >= limit.critical {
 AlertSeverity::Critical
 } else if value >= limit.warning {
 AlertSeverity::Warning
 } else {
 AlertSeverity::Below
 }
}

/// What one user's limits look like at sweep time: its metric snapshot plus the scope and
/// limit catalog to check it against. A provider (the control plane) assembles one of these per
/// active user each tick.
pub struct SweepTarget {
 pub user: Id,
 pub scope: RiskScope,
 pub snapshot: RiskMetricsSnapshot,
 pub limits: RiskLimitCatalog,
}

/// Supplies the set of active users to sweep on each tick. The control plane owns the
/// Portfolio Store and bot registry this needs, so it's the natural implementor.
#[async_trait::async_trait]
pub trait SweepProvider: Send + Sync {
 async fn targets(&self) -> Vec<SweepTarget>;
}

/// Runs the continuous limit sweep: every tick, recomputes each active user's
/// metrics against its enabled limits and emits a `RiskAlert` on every severity transition
/// (`Below → Warning → Critical → Breach` and back down). A `Breach` transition is returned to
/// the caller so it can decide whether to trigger `emergency_stop`.
pub struct ContinuousSweep {
 interval: Duration,
 last_severity: Mutex<HashMap<(Id, RiskLimitKind, Option<String>), AlertSeverity>>,
 sink: Arc<dyn AlertSink>,
}

impl ContinuousSweep {
 pub fn new(sink: Arc<dyn AlertSink>) -> Self {
 Self {
 interval: DEFAULT_SWEEP_INTERVAL,
 last_severity: Mutex::new(HashMap::new()),
 sink,
 }
 }

 pub fn with_interval(sink: Arc<dyn AlertSink>, interval: Duration) -> Self {
 Self {
 interval,
 last_severity: Mutex::new(HashMap::new()),
 sink,
 }
 }

 /// Sweeps one user's targets, returning every user whose metrics crossed into `Breach` this
 /// tick (candidates for `emergency_stop`).
 pub fn sweep_user(&self, target: &SweepTarget) -> bool {
 let mut breached = false;
 let checks: &[(RiskLimitKind, Decimal, Option<&str>)] = &[
 (RiskLimitKind::AggregateExposure, target.snapshot.aggregate_exposure, None),
 (RiskLimitKind::Leverage, target.snapshot.leverage, None),
 (RiskLimitKind::Drawdown, target.snapshot.drawdown, None),
 (RiskLimitKind::MaxDailyLoss, (-target.snapshot.day_to_date_pnl).max(Decimal::ZERO), None),
 (RiskLimitKind::OpenPositionCount, Decimal::from(target.snapshot.open_position_count as u64), None),
 ];

 for (kind, value, symbol) in checks {
 if let Some(limit) = target.limits.for_kind(*kind, &target.scope, *symbol) {
 self.apply_transition(target.user, limit, *value, &mut breached);
 }
 }

 for (symbol, exposure) in &target.snapshot.exposure_by_symbol {
 if let Some(limit) = target.limits.for_kind(RiskLimitKind::SymbolExposure, &target.scope, Some(symbol)) {
 self.apply_transition(target.user, limit, *exposure, &mut breached);
 }
 }

 breached
 }

 fn apply_transition(&self, user: Id, limit: &RiskLimit, value: Decimal, breached: &mut bool) {
 let severity = classify(value, limit);
 let key = (user, limit.kind, limit.symbol.clone());
 let mut last_severity = self.last_severity.lock();
 let previous = last_severity.insert(key, severity).unwrap_or(AlertSeverity::Below);

 if severity != previous {
 self.sink.alert(RiskAlert::from_limit(user, limit, severity, value));
 if severity == AlertSeverity::Breach {
 *breached = true;
 }
 }
 }

 /// Runs the sweep loop forever at the configured interval, calling `emergency_stop` for
 /// every user whose sweep this tick produced a fresh breach.
 pub async fn start<P, F>(&self, provider: P, mut emergency_stop: F)
 where
 P: SweepProvider,
 F: FnMut(Id),
 {
 let mut ticker = time::interval(self.interval);
 loop {
 ticker.tick().await;
 for target in provider.targets().await {
 let user = target.user;
 if self.sweep_user(&target) {
 emergency_stop(user);
 }
 }
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::alert::VecAlertSink;
 use rust_decimal_macros::dec;
 use std::collections::HashMap as StdHashMap;

 fn snapshot(aggregate_exposure: Decimal, leverage: Decimal) -> RiskMetricsSnapshot {
 RiskMetricsSnapshot {
 equity: dec!(10000),
 exposure_by_symbol: StdHashMap::new(),
 aggregate_exposure,
 leverage,
 margin_level: dec!(1),
 day_to_date_pnl: Decimal::ZERO,
 drawdown: Decimal::ZERO,
 open_position_count: 0,
 }
 }

 #[test]
 fn crossing_into_critical_emits_exactly_one_alert() {
 let sink = Arc::new(VecAlertSink::default());
 let sweep = ContinuousSweep::new(sink.clone());
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let user = Id::new();
 let target = SweepTarget { user, scope: RiskScope::User, snapshot: snapshot(dec!(0), dec!(9)), limits: catalog };

 let breached = sweep.sweep_user(&target);
 assert!(!breached);
 assert_eq!(sink.alerts.lock().len(), 1);
 assert_eq!(sink.alerts.lock()[0].severity, AlertSeverity::Critical);
 }

 #[test]
 fn the_same_severity_on_the_next_tick_does_not_re_alert() {
 let sink = Arc::new(VecAlertSink::default());
 let sweep = ContinuousSweep::new(sink.clone());
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let user = Id::new();
 let target = SweepTarget { user, scope: RiskScope::User, snapshot: snapshot(dec!(0), dec!(9)), limits: catalog };

 sweep.sweep_user(&target);
 sweep.sweep_user(&target);
 assert_eq!(sink.alerts.lock().len(), 1, "steady-state severity must not re-alert every tick");
 }

 #[test]
 fn crossing_into_breach_is_reported_to_the_caller() {
 let sink = Arc::new(VecAlertSink::default());
 let sweep = ContinuousSweep::new(sink.clone());
 let catalog = RiskLimitCatalog::new().with_limit(RiskLimit::new( RiskLimitKind::Leverage, RiskScope::User, dec!(5), dec!(8), dec!(10),
));
 let user = Id::new();
 let target = SweepTarget { user, scope: RiskScope::User, snapshot: snapshot(dec!(0), dec!(11)), limits: catalog };

 assert!(sweep.sweep_user(&target));
 assert_eq!(sink.alerts.lock()[0].severity, AlertSeverity::Breach);
 }
}
