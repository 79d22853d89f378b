//! Startup configuration: every recognized environment key is read once, here, with an
//! explicit default where one makes sense and a hard `ConfigError` where it doesn't.
//! Nothing downstream reaches into `std::env` directly.

use ferrotrade_instrument::Environment;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
 #[error("missing required environment variable {0}")]
 MissingRequired(&'static str),

 #[error("invalid value for environment variable {key}: {detail}")]
 InvalidValue { key: &'static str, detail: String },
}

fn required(key: &'static str) -> Result<String, ConfigError> {
 env::var(key).map_err(|_| ConfigError::MissingRequired(key))
}

fn optional_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
 match env::var(key) {
 Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { key, detail: raw }),
 Err(_) => Ok(default),
 }
}

/// Every venue/environment pair resolves to its own base URL, overridable via
/// `FERROTRADE_EXCHANGE_BASE_URL_<VENUE>_<ENV>` (e.g. `..._BINANCEUSDFUTURES_MAINNET`); absent
/// overrides fall back to the adapter's own compiled-in default.
#[derive(Debug, Clone, Default)]
pub struct ExchangeBaseUrls {
 overrides: HashMap<String, String>,
}

impl ExchangeBaseUrls {
 fn from_env() -> Self {
 let mut overrides = HashMap::new();
 for (key, value) in env::vars() {
 if let Some(suffix) = key.strip_prefix("FERROTRADE_EXCHANGE_BASE_URL_") {
 overrides.insert(suffix.to_lowercase(), value);
 }
 }
 Self { overrides }
 }

 pub fn get(&self, venue: &str, env: &str) -> Option<&str> {
 self.overrides.get(&format!("{venue}_{env}").to_lowercase()).map(String::as_str)
 }
}

/// Loaded once at process startup and passed by reference into component
/// constructors — never a global.
#[derive(Debug, Clone)]
pub struct Config {
 pub database_url: String,
 pub cache_url: String,
 pub jwt_signing_key: String,
 pub credential_encryption_key: String,
 pub exchange_base_urls: ExchangeBaseUrls,
 pub worker_pool_size: usize,
 pub scheduler_tick: Duration,
 pub risk_sweep_interval: Duration,
 pub job_data_ttl_days: u64,
 pub job_result_ttl_days: u64,
 pub log_format: LogFormat,
 pub http_bind_addr: String,
 /// The venue environment the Market-Data Hub's own ingestion connection runs against, and
 /// the default a new `ExchangeConnection` is assumed to want absent an explicit override.
 pub exchange_environment: Environment,
 /// Credentials for the control plane's own market-data ingestion connection, distinct from
 /// any individual user's trading credentials (market data is ingested once per
 /// venue, not once per user).
 pub market_data_api_key: String,
 pub market_data_api_secret: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogFormat {
 Pretty,
 Json,
}

impl std::str::FromStr for LogFormat {
 type Err = String;

 fn from_str(value: &str) -> Result<Self, Self::Err> {
 match value.to_ascii_lowercase().as_str() {
 "json" => Ok(LogFormat::Json),
 "pretty" => Ok(LogFormat::Pretty),
 _ => Err(format!("unrecognized log format {value:?}")),
 }
 }
}

impl Config {
 pub fn from_env() -> Result<Self, ConfigError> {
 Ok(Self {
 database_url: required("FERROTRADE_DATABASE_URL")?,
 cache_url: required("FERROTRADE_CACHE_URL")?,
 jwt_signing_key: required("FERROTRADE_JWT_SIGNING_KEY")?,
 credential_encryption_key: required("FERROTRADE_CREDENTIAL_ENCRYPTION_KEY")?,
 exchange_base_urls: ExchangeBaseUrls::from_env(),
 worker_pool_size: optional_parsed("FERROTRADE_WORKER_POOL_SIZE", 4usize)?,
 scheduler_tick: Duration::from_secs(optional_parsed("FERROTRADE_SCHEDULER_TICK_SECONDS", 30u64)?),
 risk_sweep_interval: Duration::from_secs(optional_parsed("FERROTRADE_RISK_SWEEP_SECONDS", 60u64)?),
 job_data_ttl_days: optional_parsed("FERROTRADE_JOB_DATA_TTL_DAYS", 7u64)?,
 job_result_ttl_days: optional_parsed("FERROTRADE_JOB_RESULT_TTL_DAYS", 1u64)?,
 log_format: optional_parsed("FERROTRADE_LOG_FORMAT", LogFormat::Pretty)?,
 http_bind_addr: env::var("FERROTRADE_HTTP_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
 exchange_environment: match env::var("FERROTRADE_EXCHANGE_ENVIRONMENT").as_deref() {
 Ok("mainnet") => Environment::Mainnet,
 Ok("testnet") | Err(_) => Environment::Testnet,
 Ok(other) => {
 return Err(ConfigError::InvalidValue {
 key: "FERROTRADE_EXCHANGE_ENVIRONMENT",
 detail: other.to_string(),
 })
 }
 },
 market_data_api_key: env::var("FERROTRADE_MARKET_DATA_API_KEY").unwrap_or_default(),
 market_data_api_secret: env::var("FERROTRADE_MARKET_DATA_API_SECRET").unwrap_or_default(),
 })
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn missing_a_required_key_is_reported_by_name() {
 // SAFETY: tests run single-threaded per-process for env mutation in this module only.
 unsafe { env::remove_var("FERROTRADE_DATABASE_URL") };
 let err = required("FERROTRADE_DATABASE_URL").unwrap_err();
 assert!(matches!(err, ConfigError::MissingRequired("FERROTRADE_DATABASE_URL")));
 }

 #[test]
 fn an_absent_optional_key_falls_back_to_its_default() {
 unsafe { env::remove_var("FERROTRADE_WORKER_POOL_SIZE") };
 assert_eq!(optional_parsed::<usize>("FERROTRADE_WORKER_POOL_SIZE", 4).unwrap(), 4);
 }

 #[test]
 fn an_invalid_optional_value_is_reported_with_the_offending_text() {
 unsafe { env::set_var("FERROTRADE_WORKER_POOL_SIZE", "not-a-number") };
 let err = optional_parsed::<usize>("FERROTRADE_WORKER_POOL_SIZE", 4).unwrap_err();
 assert!(matches!(err, ConfigError::InvalidValue { detail, .. } if detail == "not-a-number"));
 unsafe { env::remove_var("FERROTRADE_WORKER_POOL_SIZE") };
 }
}
