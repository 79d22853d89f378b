use crate::error::JobError;
use crate::model::{Job, JobPriority, JobStatus, NewJob};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ferrotrade_cache::Cache;
use ferrotrade_integration::Id;
use std::time::Duration;
use tracing::{info, warn};

const RECORD_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
const RESULT_TTL: Duration = Duration::from_secs(24 * 3600);
const RETRY_DELAY_CAP_SECS: i64 = 3600;

fn record_key(id: Id) -> String {
 format!("job:record:{id}")
}

fn result_key(id: Id) -> String {
 format!("job:result:{id}")
}

fn queue_key(priority: JobPriority) -> String {
 format!("job:queue:{}", priority.as_str())
}

const SCHEDULED_KEY: &str = "job:scheduled";
const PROCESSING_KEY: &str = "job:processing";
const DLQ_KEY: &str = "job:dlq";

/// The outcome of [`JobQueue::fail`]: whether the job was rescheduled or exhausted its budget
/// (retry policy).
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
 Retrying { next_run: DateTime<Utc> },
 DeadLettered,
}

/// The Redis-backed priority queue: four FIFO lists, a scheduled sorted set, a
/// processing set, and a dead-letter list, all layered on [`Cache`]'s generic primitives.
pub struct JobQueue {
 cache: Cache,
}

impl JobQueue {
 pub fn new(cache: Cache) -> Self {
 Self { cache }
 }

 async fn put_record(&self, job: &Job) -> Result<(), JobError> {
 self.cache.set_json(&record_key(job.id), job, Some(RECORD_TTL)).await?;
 Ok(())
 }

 pub async fn get(&self, id: Id) -> Result<Job, JobError> {
 self.cache
 .get_json(&record_key(id))
 .await?
 .ok_or_else(|| JobError::NotFound(id.to_string()))
 }

 /// Pushes an immediate job onto its priority list (enqueue).
 pub async fn enqueue(&self, new_job: NewJob) -> Result<Id, JobError> {
 let job = Job::from_new(new_job, Utc::now());
 let id = job.id;
 self.put_record(&job).await?;
 self.cache.list_push_right(&queue_key(job.priority), &id.to_string()).await?;
 info!(job_id = %id, name = %job.name, priority = ?job.priority, "job enqueued");
 Ok(id)
 }

 /// Adds a job to the scheduled sorted set keyed by its target epoch (enqueue).
 pub async fn enqueue_scheduled(&self, new_job: NewJob, run_at: DateTime<Utc>) -> Result<Id, JobError> {
 let mut job = Job::from_new(new_job, Utc::now());
 job.scheduled_at = Some(run_at);
 let id = job.id;
 self.put_record(&job).await?;
 self.cache
 .sorted_set_add(SCHEDULED_KEY, &id.to_string(), run_at.timestamp_millis() as f64)
 .await?;
 Ok(id)
 }

 /// Promotes every scheduled job whose target time has passed onto its priority list.
 /// Uses [`Cache::sorted_set_remove`]'s claim semantics so two
 /// workers racing on the same tick never both promote the same job.
 pub async fn promote_due(&self, now: DateTime<Utc>) -> Result<u64, JobError> {
 let due = self
 .cache
 .sorted_set_range_by_score(SCHEDULED_KEY, f64::MIN, now.timestamp_millis() as f64)
 .await?;

 let mut promoted = 0;
 for raw_id in due {
 if !self.cache.sorted_set_remove(SCHEDULED_KEY, &raw_id).await? {
 continue; // another worker already claimed this tick.
 }
 let id: Id = match raw_id.parse() {
 Ok(id) => id,
 Err(_) => continue,
 };
 let job = self.get(id).await?;
 self.cache.list_push_right(&queue_key(job.priority), &raw_id).await?;
 promoted += 1;
 }
 Ok(promoted)
 }

 /// Atomically pops the next job in strict priority order and marks it `Running`:
 /// critical, then high, then normal, then low.
 pub async fn claim_next(&self) -> Result<Option<Job>, JobError> {
 for priority in JobPriority::ALL_BY_DISPATCH_ORDER {
 let Some(raw_id) = self.cache.list_pop_left_and_set_add(&queue_key(priority), PROCESSING_KEY).await? else {
 continue;
 };
 let Ok(id) = raw_id.parse::<Id>() else { continue };
 let mut job = self.get(id).await?;
 job.status = JobStatus::Running;
 job.started_at = Some(Utc::now());
 self.put_record(&job).await?;
 return Ok(Some(job));
 }
 Ok(None)
 }

 /// Marks a claimed job `Completed`, stores its result under a separate short-lived key, and
 /// releases its processing-set claim.
 pub async fn complete(&self, mut job: Job, result: serde_json::Value) -> Result<(), JobError> {
 job.status = JobStatus::Completed;
 job.completed_at = Some(Utc::now());
 job.result = Some(result.clone());
 self.put_record(&job).await?;
 self.cache.set_json(&result_key(job.id), &result, Some(RESULT_TTL)).await?;
 self.cache.set_remove(PROCESSING_KEY, &job.id.to_string()).await?;
 Ok(())
 }

 /// Applies the retry policy on failure: reschedule at
 /// `now + min(60 · 2^retryCount, 3600)s` while `retryCount < maxRetries`, else dead-letter.
 pub async fn fail(&self, mut job: Job, error: String) -> Result<FailureOutcome, JobError> {
 self.cache.set_remove(PROCESSING_KEY, &job.id.to_string()).await?;
 job.error = Some(error);

 if job.retry_count < job.max_retries {
 job.retry_count += 1;
 let delay_secs = (60i64 << job.retry_count.min(20)).min(RETRY_DELAY_CAP_SECS);
 let next_run = Utc::now() + ChronoDuration::seconds(delay_secs);
 job.status = JobStatus::Retrying;
 job.scheduled_at = Some(next_run);
 self.put_record(&job).await?;
 self.cache
 .sorted_set_add(SCHEDULED_KEY, &job.id.to_string(), next_run.timestamp_millis() as f64)
 .await?;
 warn!(job_id = %job.id, retry_count = job.retry_count, next_run = %next_run, "job failed, rescheduled");
 Ok(FailureOutcome::Retrying { next_run })
 } else {
 job.status = JobStatus::Failed;
 self.put_record(&job).await?;
 self.cache.list_push_right(DLQ_KEY, &job.id.to_string()).await?;
 warn!(job_id = %job.id, retry_count = job.retry_count, "job exhausted retries, moved to dead-letter queue");
 Ok(FailureOutcome::DeadLettered)
 }
 }

 /// Jobs currently in the dead-letter list ("inspected by operators and may be
 /// re-enqueued").
 pub async fn list_dlq(&self) -> Result<Vec<Job>, JobError> {
 let ids = self.cache.list_range(DLQ_KEY, 0, -1).await?;
 let mut jobs = Vec::with_capacity(ids.len());
 for raw_id in ids {
 if let Ok(id) = raw_id.parse::<Id>() {
 jobs.push(self.get(id).await?);
 }
 }
 Ok(jobs)
 }

 /// Re-queues a dead-lettered job for another attempt, resetting its retry budget.
 pub async fn requeue_from_dlq(&self, id: Id) -> Result<(), JobError> {
 let mut job = self.get(id).await?;
 job.retry_count = 0;
 job.status = JobStatus::Pending;
 job.error = None;
 self.put_record(&job).await?;
 self.cache.list_push_right(&queue_key(job.priority), &id.to_string()).await?;
 Ok(())
 }
}
