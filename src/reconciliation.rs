//! Delegates [`ferrotrade_execution::router::ReconciliationQueue`] to the Job System, per that
//! trait's own doc comment: "the Job System (C7) is the real implementor."

use ferrotrade_execution::ReconciliationQueue;
use ferrotrade_integration::Id;
use ferrotrade_jobs::{JobPriority, JobQueue, NewJob};
use std::sync::Arc;
use tracing::error;

pub const RECONCILE_ORDER_JOB: &str = "reconcile-order";

pub struct ControlPlaneReconciliationQueue {
    queue: Arc<JobQueue>,
}

impl ControlPlaneReconciliationQueue {
    pub fn new(queue: Arc<JobQueue>) -> Self {
        Self { queue }
    }
}

impl ReconciliationQueue for ControlPlaneReconciliationQueue {
    fn enqueue_high_priority(&self, order_id: Id) {
        let queue = self.queue.clone();
        tokio::spawn(async move {
            let job = NewJob::new(RECONCILE_ORDER_JOB, serde_json::json!({ "order_id": order_id.to_string() }))
                .with_priority(JobPriority::High);
            if let Err(err) = queue.enqueue(job).await {
                error!(%order_id, %err, "failed to enqueue order reconciliation job");
            }
        });
    }
}
