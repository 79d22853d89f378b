//! The Job System: a Redis-backed priority queue, an interval/cron/once scheduler,
//! and a worker pool that dispatches jobs with per-job timeouts and retry-to-dead-letter.

pub mod cron;
pub mod error;
pub mod handler;
pub mod model;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use cron::CronSchedule;
pub use error::JobError;
pub use handler::{HandlerRegistry, JobHandler};
pub use model::{
 Job, JobPriority, JobStatus, NewJob, ScheduleType, ScheduledTask, DEFAULT_JOB_TIMEOUT,
 DEFAULT_MAX_RETRIES,
};
pub use queue::{FailureOutcome, JobQueue};
pub use scheduler::{InMemoryScheduledTaskStore, ScheduledTaskStore, Scheduler, DEFAULT_TICK_INTERVAL};
pub use worker::{Worker, WorkerPool};
