use serde::{Deserialize, Serialize};

/// A point-in-time view of some mutable state, tagged with the instant it was taken. Used
/// wherever a component hands a consistent read to a caller that will act on it slightly later
/// (e.g. the Risk Engine's `portfolioSnapshot` input to `evaluateNewOrder`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
 pub taken_at: chrono::DateTime<chrono::Utc>,
 pub value: T,
}

impl<T> Snapshot<T> {
 pub fn new(value: T) -> Self {
 Self {
 taken_at: chrono::Utc::now(),
 value,
 }
 }

 pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Snapshot<U> {
 Snapshot {
 taken_at: self.taken_at,
 value: f(self.value),
 }
 }
}
