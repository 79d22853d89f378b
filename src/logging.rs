use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise pretty-printed logging (`FERROTRADE_LOG_FORMAT=pretty`, the default).
pub fn init_logging() {
 tracing_subscriber::registry
 .with( tracing_subscriber::filter::EnvFilter::builder
 .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
 .from_env_lossy(),
)
 .with(tracing_subscriber::fmt::layer)
 .init()
}

/// Initialise JSON logging (`FERROTRADE_LOG_FORMAT=json`), one line per event, for
/// ingestion by a log aggregator.
pub fn init_json_logging() {
 tracing_subscriber::registry
 .with( tracing_subscriber::filter::EnvFilter::builder
 .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
 .from_env_lossy(),
)
 .with(tracing_subscriber::fmt::layer.json.flatten_event(true))
 .init()
}
