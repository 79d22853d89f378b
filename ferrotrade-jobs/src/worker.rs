use crate::handler::HandlerRegistry;
use crate::model::Job;
use crate::queue::JobQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long a worker sleeps between dispatch-loop ticks when it found nothing to claim. Not
/// spec-mandated; kept short enough that scheduled jobs are picked up promptly without busy-
/// looping Redis.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One independent dispatch loop ("Workers"): promotes due scheduled jobs, claims the
/// next job in strict priority order, and runs it under its configured timeout. Each worker owns
/// its own processing claim, so no two workers can ever run the same job id at once — the
/// underlying guarantee comes from [`JobQueue::claim_next`]'s atomic pop-and-claim, not from any
/// coordination between workers.
pub struct Worker {
 queue: Arc<JobQueue>,
 handlers: Arc<HandlerRegistry>,
 running: Arc<AtomicBool>,
}

impl Worker {
 pub fn new(queue: Arc<JobQueue>, handlers: Arc<HandlerRegistry>) -> Self {
 Self { queue, handlers, running: Arc::new(AtomicBool::new(true)) }
 }

 pub fn stop_flag(&self) -> Arc<AtomicBool> {
 self.running.clone()
 }

 pub async fn run(&self) {
 while self.running.load(Ordering::Relaxed) {
 if let Err(err) = self.queue.promote_due(chrono::Utc::now()).await {
 error!(%err, "failed to promote due scheduled jobs");
 }

 match self.queue.claim_next().await {
 Ok(Some(job)) => self.dispatch(job).await,
 Ok(None) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
 Err(err) => {
 error!(%err, "failed to claim next job");
 tokio::time::sleep(IDLE_POLL_INTERVAL).await;
 }
 }
 }
 }

 async fn dispatch(&self, job: Job) {
 let job_id = job.id;
 let Some(handler) = self.handlers.get(&job.name) else {
 warn!(%job_id, name = %job.name, "no handler registered, dead-lettering");
 let _ = self.queue.fail(job, format!("no handler registered for {}", job.name)).await;
 return;
 };

 let timeout = job.timeout;
 let args = job.args.clone();
 let outcome = tokio::time::timeout(timeout, handler.handle(&args)).await;

 match outcome {
 Ok(Ok(result)) => {
 info!(%job_id, "job completed");
 if let Err(err) = self.queue.complete(job, result).await {
 error!(%job_id, %err, "failed to persist job completion");
 }
 }
 Ok(Err(handler_error)) => {
 let _ = self.queue.fail(job, handler_error).await;
 }
 Err(_) => {
 let _ = self.queue.fail(job, format!("timed out after {timeout:?}")).await;
 }
 }
 }
}

/// A configurable-size set of [`Worker`]s sharing one [`JobQueue`] and [`HandlerRegistry`].
pub struct WorkerPool {
 stop_flags: Vec<Arc<AtomicBool>>,
 handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
 pub fn spawn(size: usize, queue: Arc<JobQueue>, handlers: Arc<HandlerRegistry>) -> Self {
 let mut stop_flags = Vec::with_capacity(size);
 let mut handles = Vec::with_capacity(size);

 for _ in 0..size.max(1) {
 let worker = Worker::new(queue.clone(), handlers.clone());
 stop_flags.push(worker.stop_flag());
 handles.push(tokio::spawn(async move { worker.run().await }));
 }

 Self { stop_flags, handles }
 }

 /// Signals every worker to stop after its current job, without awaiting shutdown.
 pub fn stop(&self) {
 for flag in &self.stop_flags {
 flag.store(false, Ordering::Relaxed);
 }
 }

 pub async fn join(self) {
 for handle in self.handles {
 let _ = handle.await;
 }
 }
}
