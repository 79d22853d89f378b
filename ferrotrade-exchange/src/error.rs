use thiserror::Error;

/// The outcome taxonomy every [`crate::capability::ExchangeAdapter`] method is restricted to
/// : callers above C1 branch on these three variants only, never on venue-specific
/// error codes.
#[derive(Debug, Error, Clone)]
pub enum ExchangeError {
 /// Retry budget exhausted on a transient fault (5xx, throttle, pre-dispatch network error).
 #[error("exchange transient error on {endpoint}: retry budget exhausted ({attempts} attempts): {detail}")]
 ExchangeTransient {
 endpoint: String,
 attempts: u32,
 detail: String,
 },

 /// The venue returned a final, non-retryable rejection.
 #[error("exchange rejected {endpoint} (code {venue_code}): {detail}")]
 ExchangeRejected {
 endpoint: String,
 venue_code: i64,
 detail: String,
 },

 /// A network error occurred after a SIGNED request was dispatched: the caller cannot tell
 /// whether the venue applied the request and must reconcile rather than retry.
 #[error("exchange outcome unknown for {endpoint}: {detail}")]
 ExchangeUnknown { endpoint: String, detail: String },
}

impl ExchangeError {
 pub fn endpoint(&self) -> &str {
 match self {
 Self::ExchangeTransient { endpoint, .. }
 | Self::ExchangeRejected { endpoint, .. }
 | Self::ExchangeUnknown { endpoint, .. } => endpoint,
 }
 }
}
