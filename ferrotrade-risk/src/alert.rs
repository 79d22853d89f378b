use crate::limit::{RiskLimit, RiskLimitKind};
use chrono::{DateTime, Utc};
use ferrotrade_integration::Id;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Severity ladder the continuous sweep transitions through ("Below → Warning →
/// Critical → Breach").
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
 Below,
 Warning,
 Critical,
 Breach,
}

/// A risk alert raised either by a sweep transition or by pre-trade evaluation recording an
/// audited-but-permitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
 pub id: Id,
 pub user: Id,
 pub kind: RiskLimitKind,
 pub symbol: Option<String>,
 pub severity: AlertSeverity,
 pub value: Decimal,
 pub threshold: Decimal,
 pub raised_at: DateTime<Utc>,
}

impl RiskAlert {
 pub fn from_limit(user: Id, limit: &RiskLimit, severity: AlertSeverity, value: Decimal) -> Self {
 let threshold = match severity {
 AlertSeverity::Warning => limit.warning,
 AlertSeverity::Critical => limit.critical,
 AlertSeverity::Breach => limit.breach,
 AlertSeverity::Below => limit.warning,
 };
 Self {
 id: Id::new(),
 user,
 kind: limit.kind,
 symbol: limit.symbol.clone(),
 severity,
 value,
 threshold,
 raised_at: Utc::now(),
 }
 }
}

/// Receives risk alerts as they are raised. The default implementation just logs; a control
/// plane wiring this crate up can bridge alerts to the Client Distribution Hub or a persisted
/// audit log by swapping in its own hook.
pub trait AlertSink: Send + Sync {
 fn alert(&self, alert: RiskAlert);
}

/// Emits every alert via `tracing`, at a level proportional to severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
 fn alert(&self, alert: RiskAlert) {
 match alert.severity {
 AlertSeverity::Below => {}
 AlertSeverity::Warning => tracing::warn!( user = %alert.user, kind = ?alert.kind, symbol = ?alert.symbol,
 value = %alert.value, threshold = %alert.threshold, "risk warning"
),
 AlertSeverity::Critical => tracing::error!( user = %alert.user, kind = ?alert.kind, symbol = ?alert.symbol,
 value = %alert.value, threshold = %alert.threshold, "risk critical"
),
 AlertSeverity::Breach => tracing::error!( user = %alert.user, kind = ?alert.kind, symbol = ?alert.symbol,
 value = %alert.value, threshold = %alert.threshold, "risk breach"
),
 }
 }
}

/// Stores every alert it receives, for tests and for dashboards that poll recent history.
#[derive(Debug, Default)]
pub struct VecAlertSink {
 pub alerts: parking_lot::Mutex<Vec<RiskAlert>>,
}

impl AlertSink for VecAlertSink {
 fn alert(&self, alert: RiskAlert) {
 self.alerts.lock().push(alert);
 }
}
