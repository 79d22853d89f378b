use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum JobError {
    #[error("cache error: {0}")]
    Cache(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("invalid cron expression {expr:?}: {detail}")]
    InvalidCronExpression { expr: String, detail: String },

    #[error("no handler registered for job {0:?}")]
    NoHandler(String),
}

impl From<ferrotrade_cache::CacheError> for JobError {
    fn from(err: ferrotrade_cache::CacheError) -> Self {
        JobError::Cache(err.to_string())
    }
}
