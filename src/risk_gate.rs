//! Wires [`ferrotrade_execution::router::RiskGate`] to the Risk Engine's pure
//! `evaluate_new_order` function plus whatever state the control plane already holds — no
//! component owns this bridge itself since the Order Router only knows the trait, and the Risk
//! Engine only knows pure functions over a snapshot it doesn't assemble itself.

use ferrotrade_exchange::model::PlaceOrderRequest;
use ferrotrade_execution::RiskGate;
use ferrotrade_instrument::AssetName;
use ferrotrade_integration::Id;
use ferrotrade_portfolio::PortfolioStore;
use ferrotrade_risk::{evaluate_new_order, OrderRiskDecision, RiskLimitCatalog, RiskMetricsTracker, RiskScope};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-user risk limits plus the running metrics baseline every pre-trade check is projected
/// against. Shared across every user's `OrderRouter` instance: the catalog a new bot trades
/// under is whatever the owning user has configured at `RiskScope::User`, since scopes
/// most limits per-user by default and `RiskScope::Bot` only where a bot overrides one.
pub struct ControlPlaneRiskGate<PR: ferrotrade_portfolio::PortfolioRepository> {
 portfolio: Arc<PortfolioStore<PR>>,
 limits: Arc<Mutex<HashMap<Id, RiskLimitCatalog>>>,
 metrics: Arc<Mutex<RiskMetricsTracker>>,
 reference_price: Arc<dyn Fn(&str) -> rust_decimal::Decimal + Send + Sync>,
 margin_asset: AssetName,
}

impl<PR: ferrotrade_portfolio::PortfolioRepository> ControlPlaneRiskGate<PR> {
 pub fn new( portfolio: Arc<PortfolioStore<PR>>,
 limits: Arc<Mutex<HashMap<Id, RiskLimitCatalog>>>,
 metrics: Arc<Mutex<RiskMetricsTracker>>,
 reference_price: Arc<dyn Fn(&str) -> rust_decimal::Decimal + Send + Sync>,
 margin_asset: AssetName,
) -> Self {
 Self { portfolio, limits, metrics, reference_price, margin_asset }
 }
}

impl<PR: ferrotrade_portfolio::PortfolioRepository> RiskGate for ControlPlaneRiskGate<PR> {
 fn evaluate_new_order(&self, user: Id, request: &PlaceOrderRequest) -> OrderRiskDecision {
 let positions = self.portfolio.open_positions(user);
 let balances = self.portfolio.balances(user);
 let snapshot = self.metrics.lock().compute(user, &positions, &balances, &self.margin_asset);

 let catalog = self.limits.lock().get(&user).cloned().unwrap_or_default();
 if catalog.is_empty() {
 return OrderRiskDecision::Allowed;
 }

 let mark_price = (self.reference_price)(&request.symbol);
 evaluate_new_order(request, &snapshot, mark_price, &catalog, &RiskScope::User)
 }
}
