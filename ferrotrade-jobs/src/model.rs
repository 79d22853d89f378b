use chrono::{DateTime, Utc};
use ferrotrade_integration::Id;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// Dispatch order is strict: critical before high before normal before low.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobPriority {
 Critical,
 High,
 Normal,
 Low,
}

impl JobPriority {
 pub const ALL_BY_DISPATCH_ORDER: [JobPriority; 4] =
 [JobPriority::Critical, JobPriority::High, JobPriority::Normal, JobPriority::Low];

 pub fn as_str(&self) -> &'static str {
 match self {
 JobPriority::Critical => "critical",
 JobPriority::High => "high",
 JobPriority::Normal => "normal",
 JobPriority::Low => "low",
 }
 }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
 Pending,
 Running,
 Completed,
 Failed,
 Cancelled,
 Retrying,
}

/// One unit of work (`Job`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
 pub id: Id,
 pub name: String,
 pub args: serde_json::Value,
 pub priority: JobPriority,
 pub status: JobStatus,
 pub scheduled_at: Option<DateTime<Utc>>,
 pub retry_count: u32,
 pub max_retries: u32,
 #[serde(with = "duration_secs")]
 pub timeout: Duration,
 pub created_at: DateTime<Utc>,
 pub started_at: Option<DateTime<Utc>>,
 pub completed_at: Option<DateTime<Utc>>,
 pub error: Option<String>,
 pub result: Option<serde_json::Value>,
 pub user: Option<Id>,
}

/// What the caller supplies to enqueue a new job; the queue fills in `id`, `status`, timestamps.
#[derive(Debug, Clone)]
pub struct NewJob {
 pub name: String,
 pub args: serde_json::Value,
 pub priority: JobPriority,
 pub max_retries: u32,
 pub timeout: Duration,
 pub user: Option<Id>,
}

impl NewJob {
 pub fn new(name: impl Into<String>, args: serde_json::Value) -> Self {
 Self {
 name: name.into(),
 args,
 priority: JobPriority::Normal,
 max_retries: DEFAULT_MAX_RETRIES,
 timeout: DEFAULT_JOB_TIMEOUT,
 user: None,
 }
 }

 pub fn with_priority(mut self, priority: JobPriority) -> Self {
 self.priority = priority;
 self
 }

 pub fn with_max_retries(mut self, max_retries: u32) -> Self {
 self.max_retries = max_retries;
 self
 }

 pub fn with_user(mut self, user: Id) -> Self {
 self.user = Some(user);
 self
 }
}

impl Job {
 pub fn from_new(new: NewJob, now: DateTime<Utc>) -> Self {
 Self {
 id: Id::new(),
 name: new.name,
 args: new.args,
 priority: new.priority,
 status: JobStatus::Pending,
 scheduled_at: None,
 retry_count: 0,
 max_retries: new.max_retries,
 timeout: new.timeout,
 created_at: now,
 started_at: None,
 completed_at: None,
 error: None,
 result: None,
 user: new.user,
 }
 }
}

/// How a [`ScheduledTask`] recomputes its `next_run` (scheduler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScheduleType {
 Interval { seconds: u64 },
 Cron { expr: String },
 Once { run_at: DateTime<Utc> },
}

/// A recurring (or one-shot) enqueue rule (`ScheduledTask`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
 pub name: String,
 pub job_name: String,
 pub schedule: ScheduleType,
 pub priority: JobPriority,
 pub enabled: bool,
 pub last_run: Option<DateTime<Utc>>,
 pub next_run: Option<DateTime<Utc>>,
 pub run_count: u64,
}

mod duration_secs {
 use serde::{Deserialize, Deserializer, Serializer};
 use std::time::Duration;

 pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
 serializer.serialize_u64(duration.as_secs())
 }

 pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
 Ok(Duration::from_secs(u64::deserialize(deserializer)?))
 }
}
