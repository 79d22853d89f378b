//! The three record types only the control plane owns (Ownership): `Bot`,
//! `ExchangeConnection` and `BacktestRun`. Every other entity (orders, positions, jobs, risk
//! limits as a catalog) is owned by the component that manipulates it; these three exist only
//! as control-plane-side bookkeeping around components that otherwise have no notion of a
//! persisted, user-owned record.

use chrono::{DateTime, Utc};
use ferrotrade_instrument::Environment;
use ferrotrade_integration::Id;
use ferrotrade_strategy::{BotStatus, StrategyConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A persisted bot record (`Bot`): what `BotRuntime` is built from and torn down into
/// when the control plane starts/stops it, plus the status and performance snapshot the
/// command surface reports back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
 pub id: Id,
 pub user: Id,
 pub name: String,
 pub symbol: String,
 pub strategy: StrategyConfig,
 pub status: BotStatus,
 pub created_at: DateTime<Utc>,
 pub updated_at: DateTime<Utc>,
}

impl Bot {
 pub fn new(user: Id, name: impl Into<String>, symbol: impl Into<String>, strategy: StrategyConfig, now: DateTime<Utc>) -> Self {
 Self {
 id: Id::new(),
 user,
 name: name.into(),
 symbol: symbol.into(),
 strategy,
 status: BotStatus::Pending,
 created_at: now,
 updated_at: now,
 }
 }
}

/// A user's credentials and environment for one venue (`ExchangeConnection`). The
/// secret key is held only in its encrypted-at-rest form; decryption happens once, at adapter
/// construction time, using the control plane's `credential_encryption_key`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ExchangeConnection {
 pub id: Id,
 pub user: Id,
 pub venue: ferrotrade_instrument::ExchangeId,
 pub environment: Environment,
 pub api_key: String,
 pub encrypted_secret_key: String,
 pub label: String,
 pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ExchangeConnection {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 f.debug_struct("ExchangeConnection")
 .field("id", &self.id)
 .field("user", &self.user)
 .field("venue", &self.venue)
 .field("environment", &self.environment)
 .field("api_key", &"<redacted>")
 .field("encrypted_secret_key", &"<redacted>")
 .field("label", &self.label)
 .finish()
 }
}

impl ExchangeConnection {
 pub fn new( user: Id,
 venue: ferrotrade_instrument::ExchangeId,
 environment: Environment,
 api_key: impl Into<String>,
 encrypted_secret_key: impl Into<String>,
 label: impl Into<String>,
 now: DateTime<Utc>,
) -> Self {
 Self {
 id: Id::new(),
 user,
 venue,
 environment,
 api_key: api_key.into(),
 encrypted_secret_key: encrypted_secret_key.into(),
 label: label.into(),
 created_at: now,
 }
 }
}

/// A backtest run record (`BacktestRun`): the request plus whatever result the engine
/// has produced so far. `result` stays `None` while `status` is `Running`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
 pub id: Id,
 pub user: Id,
 pub config: ferrotrade_backtest::BacktestConfig,
 pub status: ferrotrade_backtest::BacktestStatus,
 pub result: Option<ferrotrade_backtest::BacktestResult>,
 pub created_at: DateTime<Utc>,
}

impl BacktestRun {
 pub fn new(user: Id, config: ferrotrade_backtest::BacktestConfig, now: DateTime<Utc>) -> Self {
 Self {
 id: Id::new(),
 user,
 config,
 status: ferrotrade_backtest::BacktestStatus::Running,
 result: None,
 created_at: now,
 }
 }
}

/// Shared by `Bot`, `ExchangeConnection` and `BacktestRun`: an in-memory, per-user-isolated
/// store, matching the `InMemory*Repository` shape the rest of the workspace uses.
pub struct EntityStore<T> {
 records: Mutex<HashMap<Id, T>>,
}

impl<T> Default for EntityStore<T> {
 fn default() -> Self {
 Self { records: Mutex::new(HashMap::new()) }
 }
}

pub trait Owned {
 fn id(&self) -> Id;
 fn user(&self) -> Id;
}

impl Owned for Bot {
 fn id(&self) -> Id {
 self.id
 }

 fn user(&self) -> Id {
 self.user
 }
}

impl Owned for ExchangeConnection {
 fn id(&self) -> Id {
 self.id
 }

 fn user(&self) -> Id {
 self.user
 }
}

impl Owned for BacktestRun {
 fn id(&self) -> Id {
 self.id
 }

 fn user(&self) -> Id {
 self.user
 }
}

impl<T: Owned + Clone> EntityStore<T> {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn insert(&self, record: T) {
 self.records.lock().insert(record.id, record);
 }

 /// Returns the record only if it exists and is owned by `user` (per-user isolation
 /// invariant); a mismatch is indistinguishable from a missing record to the caller.
 pub fn get_owned(&self, id: Id, user: Id) -> Option<T> {
 self.records.lock().get(&id).filter(|record| record.user == user).cloned()
 }

 pub fn list_for_user(&self, user: Id) -> Vec<T> {
 self.records.lock().values().filter(|record| record.user == user).cloned().collect()
 }

 pub fn remove_owned(&self, id: Id, user: Id) -> Option<T> {
 let mut records = self.records.lock();
 if records.get(&id).map(|record| record.user == user).unwrap_or(false) {
 records.remove(&id)
 } else {
 None
 }
 }

 pub fn replace_owned(&self, id: Id, user: Id, record: T) -> bool {
 let mut records = self.records.lock();
 if records.get(&id).map(|existing| existing.user == user).unwrap_or(false) {
 records.insert(id, record);
 true
 } else {
 false
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[derive(Clone)]
 struct Dummy {
 id: Id,
 user: Id,
 }

 impl Owned for Dummy {
 fn id(&self) -> Id {
 self.id
 }

 fn user(&self) -> Id {
 self.user
 }
 }

 #[test]
 fn a_record_is_invisible_to_a_different_user() {
 let store = EntityStore::<Dummy>::new();
 let owner = Id::new();
 let stranger = Id::new();
 let record = Dummy { id: Id::new(), user: owner };
 let id = record.id;
 store.insert(record);

 assert!(store.get_owned(id, owner).is_some());
 assert!(store.get_owned(id, stranger).is_none());
 }

 #[test]
 fn removal_by_a_non_owner_is_a_no_op() {
 let store = EntityStore::<Dummy>::new();
 let owner = Id::new();
 let stranger = Id::new();
 let record = Dummy { id: Id::new(), user: owner };
 let id = record.id;
 store.insert(record);

 assert!(store.remove_owned(id, stranger).is_none());
 assert!(store.get_owned(id, owner).is_some());
 }
}
