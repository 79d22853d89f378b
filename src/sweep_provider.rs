//! Assembles one [`SweepTarget`] per active user for the continuous risk sweep:
//! "The control plane owns the Portfolio Store and bot registry this needs, so it's the
//! natural implementor."

use async_trait::async_trait;
use ferrotrade_risk::{RiskScope, SweepProvider, SweepTarget};
use std::sync::Arc;

use crate::control_plane::Inner;

pub struct ControlPlaneSweepProvider {
 pub(crate) inner: Arc<Inner>,
}

#[async_trait]
impl SweepProvider for ControlPlaneSweepProvider {
 async fn targets(&self) -> Vec<SweepTarget> {
 let users: Vec<_> = self.inner.limits.lock().keys().copied().collect();
 let mut targets = Vec::with_capacity(users.len());
 for user in users {
 let positions = self.inner.portfolio.open_positions(user);
 let balances = self.inner.portfolio.balances(user);
 let snapshot = self.inner.metrics.lock().compute(user, &positions, &balances, &self.inner.margin_asset);
 let limits = self.inner.limits.lock().get(&user).cloned().unwrap_or_default();
 targets.push(SweepTarget { user, scope: RiskScope::User, snapshot, limits });
 }
 targets
 }
}
