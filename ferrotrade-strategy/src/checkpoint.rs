//! Per-bot state persistence: "the runtime checkpoints opaque strategy state to
//! Cache after each tick under a per-bot key so a restart resumes cleanly." Generalized from the
//! teacher's periodic `SnapshotScheduler` (which wrote whole-dataset snapshots to S3/Parquet on
//! a timer) into an event-driven, single-key writer: a checkpoint here happens right after the
//! tick that produced it, not on its own clock.
//!
//! Storage is behind [`CheckpointBackend`] rather than a concrete `Cache` so the runtime's tests
//! don't need a live Redis connection.

use crate::error::StrategyError;
use async_trait::async_trait;
use ferrotrade_cache::Cache;
use ferrotrade_integration::Id;
use std::time::Duration;

/// 30 days: long enough to survive a multi-week bot pause without the checkpoint expiring from
/// under it, short enough that abandoned bots don't accumulate Cache keys forever.
const CHECKPOINT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[async_trait]
pub trait CheckpointBackend: Send + Sync {
 async fn save_json(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<(), StrategyError>;
 async fn load_json(&self, key: &str) -> Result<Option<serde_json::Value>, StrategyError>;
 async fn delete(&self, key: &str) -> Result<(), StrategyError>;
}

#[async_trait]
impl CheckpointBackend for Cache {
 async fn save_json(&self, key: &str, value: &serde_json::Value, ttl: Duration) -> Result<(), StrategyError> {
 self.set_json(key, value, Some(ttl)).await?;
 Ok(())
 }

 async fn load_json(&self, key: &str) -> Result<Option<serde_json::Value>, StrategyError> {
 Ok(self.get_json(key).await?)
 }

 async fn delete(&self, key: &str) -> Result<(), StrategyError> {
 self.del(key).await?;
 Ok(())
 }
}

pub struct CheckpointStore<B: CheckpointBackend> {
 backend: B,
}

impl<B: CheckpointBackend> CheckpointStore<B> {
 pub fn new(backend: B) -> Self {
 Self { backend }
 }

 fn key(bot_id: Id) -> String {
 format!("bot:{bot_id}:checkpoint")
 }

 pub async fn save(&self, bot_id: Id, state: &serde_json::Value) -> Result<(), StrategyError> {
 self.backend.save_json(&Self::key(bot_id), state, CHECKPOINT_TTL).await
 }

 pub async fn load(&self, bot_id: Id) -> Result<Option<serde_json::Value>, StrategyError> {
 self.backend.load_json(&Self::key(bot_id)).await
 }

 pub async fn clear(&self, bot_id: Id) -> Result<(), StrategyError> {
 self.backend.delete(&Self::key(bot_id)).await
 }
}

#[cfg(test)]
pub(crate) mod test_support {
 use super::*;
 use parking_lot::Mutex;
 use std::collections::HashMap;

 #[derive(Default)]
 pub struct InMemoryBackend {
 store: Mutex<HashMap<String, serde_json::Value>>,
 }

 #[async_trait]
 impl CheckpointBackend for InMemoryBackend {
 async fn save_json(&self, key: &str, value: &serde_json::Value, _ttl: Duration) -> Result<(), StrategyError> {
 self.store.lock().insert(key.to_string(), value.clone());
 Ok(())
 }

 async fn load_json(&self, key: &str) -> Result<Option<serde_json::Value>, StrategyError> {
 Ok(self.store.lock().get(key).cloned())
 }

 async fn delete(&self, key: &str) -> Result<(), StrategyError> {
 self.store.lock().remove(key);
 Ok(())
 }
 }
}

#[cfg(test)]
mod tests {
 use super::test_support::InMemoryBackend;
 use super::*;

 #[tokio::test]
 async fn save_then_load_round_trips_the_checkpoint() {
 let store = CheckpointStore::new(InMemoryBackend::default());
 let bot_id = Id::new();
 store.save(bot_id, &serde_json::json!({"k": "v"})).await.unwrap();
 assert_eq!(store.load(bot_id).await.unwrap(), Some(serde_json::json!({"k": "v"})));
 }

 #[tokio::test]
 async fn clear_removes_the_checkpoint() {
 let store = CheckpointStore::new(InMemoryBackend::default());
 let bot_id = Id::new();
 store.save(bot_id, &serde_json::json!({"k": "v"})).await.unwrap();
 store.clear(bot_id).await.unwrap();
 assert_eq!(store.load(bot_id).await.unwrap(), None);
 }

 #[tokio::test]
 async fn loading_a_never_saved_bot_returns_none() {
 let store = CheckpointStore::new(InMemoryBackend::default());
 assert_eq!(store.load(Id::new()).await.unwrap(), None);
 }
}
