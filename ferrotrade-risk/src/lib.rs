//! The Risk Engine: pre-trade order evaluation, a continuous limit sweep, a 0-100
//! risk score for dashboards, and the emergency-stop procedure.

pub mod alert;
pub mod emergency;
pub mod error;
pub mod evaluate;
pub mod limit;
pub mod metrics;
pub mod score;
pub mod sweep;

pub use alert::{AlertSeverity, AlertSink, RiskAlert, TracingAlertSink, VecAlertSink};
pub use emergency::{EmergencyStop, EmergencyStopHooks, EmergencyStopRecord};
pub use error::RiskError;
pub use evaluate::{evaluate_new_order, OrderRiskDecision};
pub use limit::{RiskLimit, RiskLimitCatalog, RiskLimitKind, RiskScope};
pub use metrics::{RiskMetricsSnapshot, RiskMetricsTracker};
pub use score::risk_score;
pub use sweep::{ContinuousSweep, SweepProvider, SweepTarget, DEFAULT_SWEEP_INTERVAL};
