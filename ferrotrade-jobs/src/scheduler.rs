use crate::cron::CronSchedule;
use crate::model::{NewJob, ScheduleType, ScheduledTask};
use crate::queue::JobQueue;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Owns the set of [`ScheduledTask`] definitions the [`Scheduler`] ticks against. In-memory is
/// sufficient since tasks are registered once at startup by the control plane; the jobs they
/// enqueue are what's durable, via [`JobQueue`].
pub trait ScheduledTaskStore: Send + Sync {
 fn all(&self) -> Vec<ScheduledTask>;
 fn upsert(&self, task: ScheduledTask);
}

#[derive(Default)]
pub struct InMemoryScheduledTaskStore {
 tasks: RwLock<HashMap<String, ScheduledTask>>,
}

impl InMemoryScheduledTaskStore {
 pub fn new() -> Self {
 Self::default()
 }
}

impl ScheduledTaskStore for InMemoryScheduledTaskStore {
 fn all(&self) -> Vec<ScheduledTask> {
 self.tasks.read().values().cloned().collect()
 }

 fn upsert(&self, task: ScheduledTask) {
 self.tasks.write().insert(task.name.clone(), task);
 }
}

/// Computes the first `next_run` for a freshly registered task, scored against `now`.
fn initial_next_run(schedule: &ScheduleType, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
 match schedule {
 ScheduleType::Interval { seconds } => Some(now + ChronoDuration::seconds(*seconds as i64)),
 ScheduleType::Cron { expr } => CronSchedule::parse(expr).ok()?.next_after(now),
 ScheduleType::Once { run_at } => Some(*run_at),
 }
}

/// The next `next_run` after a task has just fired at `ran_at` (scheduler: interval
/// advances from `lastRun`, cron re-evaluates the expression, once never runs again).
fn advance_next_run(schedule: &ScheduleType, ran_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
 match schedule {
 ScheduleType::Interval { seconds } => Some(ran_at + ChronoDuration::seconds(*seconds as i64)),
 ScheduleType::Cron { expr } => CronSchedule::parse(expr).ok()?.next_after(ran_at),
 ScheduleType::Once { .. } => None,
 }
}

/// Registers and ticks [`ScheduledTask`]s (scheduler): on each tick, every enabled
/// task whose `next_run` has passed is enqueued and its `next_run` recomputed.
pub struct Scheduler {
 store: Arc<dyn ScheduledTaskStore>,
 queue: Arc<JobQueue>,
 tick_interval: Duration,
 started: AtomicBool,
 running: Arc<AtomicBool>,
}

impl Scheduler {
 pub fn new(store: Arc<dyn ScheduledTaskStore>, queue: Arc<JobQueue>) -> Self {
 Self {
 store,
 queue,
 tick_interval: DEFAULT_TICK_INTERVAL,
 started: AtomicBool::new(false),
 running: Arc::new(AtomicBool::new(true)),
 }
 }

 pub fn with_tick_interval(mut self, interval: Duration) -> Self {
 self.tick_interval = interval;
 self
 }

 /// Registers a task, computing its initial `next_run` from `now`.
 pub fn register(&self, name: impl Into<String>, job_name: impl Into<String>, schedule: ScheduleType, priority: crate::model::JobPriority) {
 let now = Utc::now();
 let next_run = initial_next_run(&schedule, now);
 self.store.upsert(ScheduledTask {
 name: name.into(),
 job_name: job_name.into(),
 schedule,
 priority,
 enabled: true,
 last_run: None,
 next_run,
 run_count: 0,
 });
 }

 /// Runs every enabled, due task once ("on each tick"). Exposed directly so tests
 /// and the control plane can drive a tick deterministically instead of waiting on a timer.
 pub async fn tick(&self, now: DateTime<Utc>) {
 for mut task in self.store.all {
 if !task.enabled {
 continue;
 }
 let Some(next_run) = task.next_run else { continue };
 if next_run > now {
 continue;
 }

 let new_job = NewJob::new(task.job_name.clone(), serde_json::Value::Null).with_priority(task.priority);
 match self.queue.enqueue(new_job).await {
 Ok(job_id) => info!(task = %task.name, %job_id, "scheduled task enqueued a job"),
 Err(err) => {
 error!(task = %task.name, %err, "failed to enqueue scheduled task's job");
 continue;
 }
 }

 task.last_run = Some(now);
 task.run_count += 1;
 task.next_run = advance_next_run(&task.schedule, now);
 self.store.upsert(task);
 }
 }

 /// Starts the tick loop as a background task. A second call while already running is a
 /// no-op ("starting an already-running scheduler is a no-op"), returning `None`.
 pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
 if self.started.swap(true, Ordering::SeqCst) {
 return None;
 }

 let scheduler = self.clone();
 Some(tokio::spawn(async move {
 let mut interval = tokio::time::interval(scheduler.tick_interval);
 loop {
 interval.tick().await;
 if !scheduler.running.load(Ordering::Relaxed) {
 break;
 }
 scheduler.tick(Utc::now()).await;
 }
 }))
 }

 pub fn stop(&self) {
 self.running.store(false, Ordering::Relaxed);
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::model::JobPriority;

 // `tick` itself calls `JobQueue::enqueue`, which needs a live Redis; these tests cover the
 // pure scheduling math (`initial_next_run`/`advance_next_run`) and the in-memory store,
 // which is everything about the scheduler that doesn't require a connection.

 #[test]
 fn initial_next_run_for_an_interval_task_is_now_plus_the_interval() {
 let now = Utc::now();
 let next = initial_next_run(&ScheduleType::Interval { seconds: 60 }, now).unwrap();
 assert_eq!(next, now + ChronoDuration::seconds(60));
 }

 #[test]
 fn a_once_task_never_runs_again_after_firing() {
 let ran_at = Utc::now();
 assert_eq!(advance_next_run(&ScheduleType::Once { run_at: ran_at }, ran_at), None);
 }

 #[test]
 fn an_interval_task_advances_from_the_run_time_not_the_original_schedule_time() {
 let ran_at = Utc::now();
 let next = advance_next_run(&ScheduleType::Interval { seconds: 30 }, ran_at).unwrap();
 assert_eq!(next, ran_at + ChronoDuration::seconds(30));
 }

 #[test]
 fn registering_a_task_computes_its_initial_next_run() {
 let store = InMemoryScheduledTaskStore::new();
 let name = "cleanup".to_string();
 let now = Utc::now();
 let next_run = initial_next_run(&ScheduleType::Interval { seconds: 120 }, now);
 store.upsert(ScheduledTask {
 name: name.clone(),
 job_name: "cleanup_stale_orders".to_string(),
 schedule: ScheduleType::Interval { seconds: 120 },
 priority: JobPriority::Low,
 enabled: true,
 last_run: None,
 next_run,
 run_count: 0,
 });

 let task = store.all.into_iter().find(|t| t.name == name).unwrap();
 assert!(task.next_run.is_some());
 assert_eq!(task.run_count, 0);
 }
}
