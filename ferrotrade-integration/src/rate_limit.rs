use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex};

/// Priority levels for rate limited operations, consumed by the Exchange Adapter 
/// when spending a venue's advertised request budget.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
 High,
 Normal,
 Low,
}

struct Waiter {
 tx: oneshot::Sender<()>,
}

struct Inner {
 capacity: usize,
 tokens: usize,
 interval: Duration,
 last_refill: Instant,
 base_interval: Duration,
 max_interval: Duration,
 high: VecDeque<Waiter>,
 normal: VecDeque<Waiter>,
 low: VecDeque<Waiter>,
}

impl Inner {
 fn refill(&mut self) {
 let now = Instant::now();
 if now.duration_since(self.last_refill) >= self.interval {
 let periods = now.duration_since(self.last_refill).as_millis() / self.interval.as_millis().max(1);
 let add_tokens = (periods as usize + 1) * self.capacity;
 self.last_refill = now;
 self.tokens = usize::min(self.tokens + add_tokens, self.capacity);
 while self.tokens > 0 {
 if let Some(waiter) = self
 .high
 .pop_front
 .or_else(|| self.normal.pop_front)
 .or_else(|| self.low.pop_front)
 {
 self.tokens -= 1;
 let _ = waiter.tx.send();
 } else {
 break;
 }
 }
 }
 }
}

/// Token bucket rate limiter with priority queues and adaptive backoff, used to respect a
/// venue's advertised rate limit without starving high-priority order placement
/// behind bulk market-data polling.
#[derive(Clone)]
pub struct RateLimiter {
 inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
 /// Construct a new [`RateLimiter`] allowing `capacity` operations every `interval`.
 pub fn new(capacity: usize, interval: Duration) -> Self {
 Self {
 inner: Arc::new(Mutex::new(Inner {
 capacity,
 tokens: capacity,
 interval,
 last_refill: Instant::now(),
 base_interval: interval,
 max_interval: interval * 16,
 high: VecDeque::new(),
 normal: VecDeque::new(),
 low: VecDeque::new(),
 })),
 }
 }

 /// Acquire a permit according to the provided priority, waiting if the bucket is empty.
 pub async fn acquire(&self, priority: Priority) {
 loop {
 let rx = {
 let mut inner = self.inner.lock().await;
 inner.refill();
 if inner.tokens > 0 {
 inner.tokens -= 1;
 None
 } else {
 let (tx, rx) = oneshot::channel;
 let waiter = Waiter { tx };
 match priority {
 Priority::High => inner.high.push_back(waiter),
 Priority::Normal => inner.normal.push_back(waiter),
 Priority::Low => inner.low.push_back(waiter),
 }
 Some(rx)
 }
 };
 match rx {
 None => return,
 Some(rx) => {
 let _ = rx.await;
 }
 }
 }
 }

 /// Report a throttle response (`-1008` / 5xx) from the venue, doubling the effective
 /// interval up to `max_interval`.
 pub async fn report_violation(&self) {
 let mut inner = self.inner.lock().await;
 let next = inner.interval * 2;
 inner.interval = std::cmp::min(next, inner.max_interval);
 }

 /// Reset the backoff to the base interval once the venue stops throttling.
 pub async fn reset_backoff(&self) {
 let mut inner = self.inner.lock().await;
 inner.interval = inner.base_interval;
 }
}

/// Exponential backoff generator matching: base 250ms, factor 2, cap 8s, ±20% jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
 base: Duration,
 factor: u32,
 cap: Duration,
 attempt: u32,
}

impl Default for Backoff {
 fn default() -> Self {
 Self {
 base: Duration::from_millis(250),
 factor: 2,
 cap: Duration::from_secs(8),
 attempt: 0,
 }
 }
}

impl Backoff {
 pub fn new(base: Duration, factor: u32, cap: Duration) -> Self {
 Self {
 base,
 factor,
 cap,
 attempt: 0,
 }
 }

 /// Returns the delay for the next attempt and advances internal state. `jitter_unit` must be
 /// in `[-1.0, 1.0]`; the caller supplies it (e.g. from `rand`) so this type stays
 /// deterministic and testable.
 pub fn next_delay(&mut self, jitter_unit: f64) -> Duration {
 let jitter_unit = jitter_unit.clamp(-1.0, 1.0);
 let unjittered = self.base * self.factor.saturating_pow(self.attempt);
 let unjittered = std::cmp::min(unjittered, self.cap);
 self.attempt = self.attempt.saturating_add(1);

 let jitter_fraction = 0.2 * jitter_unit;
 let millis = unjittered.as_millis() as f64 * (1.0 + jitter_fraction);
 Duration::from_millis(millis.max(0.0) as u64)
 }

 pub fn reset(&mut self) {
 self.attempt = 0;
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use tokio::time::{sleep, Duration as TokioDuration, Instant as TokioInstant};

 #[tokio::test]
 async fn rate_limiter_blocks_until_refill() {
 let rl = RateLimiter::new(2, TokioDuration::from_millis(50));
 rl.acquire(Priority::Normal).await;
 rl.acquire(Priority::Normal).await;
 let start = TokioInstant::now();
 rl.acquire(Priority::Normal).await;
 assert!(start.elapsed() >= TokioDuration::from_millis(50));
 }

 #[tokio::test]
 async fn high_priority_waiter_served_before_low() {
 let rl = RateLimiter::new(1, TokioDuration::from_millis(40));
 rl.acquire(Priority::Normal).await;
 let rl1 = rl.clone();
 let t1 = tokio::spawn(async move {
 rl1.acquire(Priority::Low).await;
 TokioInstant::now()
 });
 sleep(TokioDuration::from_millis(10)).await;
 let rl2 = rl.clone();
 let t2 = tokio::spawn(async move {
 rl2.acquire(Priority::High).await;
 TokioInstant::now()
 });
 let time_high = t2.await.unwrap();
 let time_low = t1.await.unwrap();
 assert!(time_high <= time_low);
 }

 #[test]
 fn backoff_caps_at_8s_and_doubles() {
 let mut backoff = Backoff::default();
 assert_eq!(backoff.next_delay(0.0), Duration::from_millis(250));
 assert_eq!(backoff.next_delay(0.0), Duration::from_millis(500));
 assert_eq!(backoff.next_delay(0.0), Duration::from_millis(1000));
 for _ in 0..10 {
 backoff.next_delay(0.0);
 }
 assert_eq!(backoff.next_delay(0.0), Duration::from_secs(8));
 }

 #[test]
 fn backoff_jitter_stays_within_twenty_percent() {
 let mut backoff = Backoff::default();
 let low = backoff.next_delay(-1.0);
 let mut backoff = Backoff::default();
 let high = backoff.next_delay(1.0);
 assert_eq!(low, Duration::from_millis(200));
 assert_eq!(high, Duration::from_millis(300));
 }
}
