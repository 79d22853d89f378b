//! Built-in job handlers the control plane registers with the Job System ("invokes
//! the registered handler"). Currently just order reconciliation; the scheduled-task handlers
//! (stale-order cleanup, etc.) are registered the same way once they exist.

use crate::control_plane::Inner;
use async_trait::async_trait;
use ferrotrade_integration::Id;
use ferrotrade_jobs::JobHandler;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Runs `OrderRouter::reconcile_order` for a SIGNED request whose outcome was unknown. The
/// job only carries an order id, not the owning user, so every user's router
/// is tried in turn — in practice this always hits on the first or second router, since a
/// control plane instance serves a small, mostly-static set of connected users.
pub struct ReconcileOrderHandler {
 pub(crate) inner: Arc<Inner>,
}

#[async_trait]
impl JobHandler for ReconcileOrderHandler {
 async fn handle(&self, args: &serde_json::Value) -> Result<serde_json::Value, String> {
 let order_id = args
 .get("order_id")
 .and_then(|value| value.as_str())
 .ok_or_else(|| "missing order_id".to_string())?;
 let order_id = Id::from_str(order_id).map_err(|err| err.to_string())?;

 let routers: Vec<_> = self.inner.routers.lock().values().cloned().collect();
 for router in routers {
 match router.reconcile_order(order_id).await {
 Ok(status) => return Ok(serde_json::json!({ "status": format!("{status:?}") })),
 Err(ferrotrade_execution::ExecutionError::NotFound(_)) => continue,
 Err(err) => {
 warn!(%order_id, %err, "order reconciliation attempt failed");
 return Err(err.to_string());
 }
 }
 }
 Err(format!("order {order_id} not found in any router"))
 }
}
