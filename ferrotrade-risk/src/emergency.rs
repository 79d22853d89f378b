use crate::error::RiskError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferrotrade_integration::Id;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// The three side effects `emergency_stop` drives , abstracted behind a trait since
/// this crate doesn't own order placement, position closing, or bot lifecycle — the control
/// plane wires a hook implementation that delegates to the Order Router, Portfolio Store and
/// Bot Runtime respectively. Every method is expected to be naturally idempotent (canceling an
/// already-canceled order, or closing an already-flat position, is a no-op).
#[async_trait]
pub trait EmergencyStopHooks: Send + Sync {
 /// Cancels every open order for `user`, best-effort, in parallel. Returns the count
 /// canceled.
 async fn cancel_all_open_orders(&self, user: Id) -> usize;

 /// Issues reduce-only market orders closing every open position for `user`. Returns the
 /// count of positions targeted.
 async fn close_all_positions_reduce_only(&self, user: Id) -> usize;

 /// Stops every running bot owned by `user`. Returns the count stopped.
 async fn stop_all_bots(&self, user: Id) -> usize;
}

#[derive(Debug, Clone)]
pub struct EmergencyStopRecord {
 pub user: Id,
 pub reason: String,
 pub orders_canceled: usize,
 pub positions_closed: usize,
 pub bots_stopped: usize,
 pub executed_at: DateTime<Utc>,
}

/// Drives `emergency_stop` against whatever hooks the control plane supplies, and
/// keeps an in-memory audit trail. Guards against two overlapping runs for the same user racing
/// each other; a second call while one is in flight is rejected rather than silently
/// interleaved, since the three side effects below are not themselves transactional.
pub struct EmergencyStop<H: EmergencyStopHooks> {
 hooks: H,
 in_progress: Mutex<HashSet<Id>>,
 audit_log: Mutex<Vec<EmergencyStopRecord>>,
}

impl<H: EmergencyStopHooks> EmergencyStop<H> {
 pub fn new(hooks: H) -> Self {
 Self {
 hooks,
 in_progress: Mutex::new(HashSet::new()),
 audit_log: Mutex::new(Vec::new()),
 }
 }

 pub async fn execute(&self, user: Id, reason: impl Into<String>) -> Result<EmergencyStopRecord, RiskError> {
 {
 let mut in_progress = self.in_progress.lock();
 if !in_progress.insert(user) {
 return Err(RiskError::EmergencyStopInProgress(user.to_string()));
 }
 }

 let (orders_canceled, positions_closed, bots_stopped) = tokio::join!( self.hooks.cancel_all_open_orders(user),
 self.hooks.close_all_positions_reduce_only(user),
 self.hooks.stop_all_bots(user),
);

 self.in_progress.lock().remove(&user);

 let record = EmergencyStopRecord {
 user,
 reason: reason.into(),
 orders_canceled,
 positions_closed,
 bots_stopped,
 executed_at: Utc::now(),
 };

 tracing::error!( %user, reason = %record.reason, orders_canceled, positions_closed, bots_stopped,
 "emergency stop executed"
);
 self.audit_log.lock().push(record.clone());
 Ok(record)
 }

 pub fn audit_log(&self) -> Vec<EmergencyStopRecord> {
 self.audit_log.lock().clone()
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use std::sync::atomic::{AtomicUsize, Ordering};

 struct CountingHooks {
 orders: AtomicUsize,
 positions: AtomicUsize,
 bots: AtomicUsize,
 }

 #[async_trait]
 impl EmergencyStopHooks for CountingHooks {
 async fn cancel_all_open_orders(&self, _user: Id) -> usize {
 self.orders.fetch_add(1, Ordering::SeqCst);
 3
 }

 async fn close_all_positions_reduce_only(&self, _user: Id) -> usize {
 self.positions.fetch_add(1, Ordering::SeqCst);
 2
 }

 async fn stop_all_bots(&self, _user: Id) -> usize {
 self.bots.fetch_add(1, Ordering::SeqCst);
 1
 }
 }

 #[tokio::test]
 async fn execute_drives_all_three_hooks_and_records_an_audit_entry() {
 let hooks = CountingHooks { orders: AtomicUsize::new(0), positions: AtomicUsize::new(0), bots: AtomicUsize::new(0) };
 let stop = EmergencyStop::new(hooks);
 let user = Id::new();

 let record = stop.execute(user, "leverage breach").await.unwrap();
 assert_eq!(record.orders_canceled, 3);
 assert_eq!(record.positions_closed, 2);
 assert_eq!(record.bots_stopped, 1);
 assert_eq!(stop.audit_log.len(), 1);
 }

 #[tokio::test]
 async fn calling_execute_twice_sequentially_is_fine() {
 let hooks = CountingHooks { orders: AtomicUsize::new(0), positions: AtomicUsize::new(0), bots: AtomicUsize::new(0) };
 let stop = EmergencyStop::new(hooks);
 let user = Id::new();

 stop.execute(user, "first").await.unwrap();
 stop.execute(user, "second").await.unwrap();
 assert_eq!(stop.audit_log.len(), 2);
 }
}
