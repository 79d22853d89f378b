use crate::error::CacheError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Thin typed wrapper over a Redis connection: every op the core depends on in one
/// place, so namespace/TTL discipline and JSON-vs-scalar encoding live here rather than being
/// re-derived at each call site.
#[derive(Clone)]
pub struct Cache {
 conn: ConnectionManager,
}

impl Cache {
 pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
 let client = redis::Client::open(redis_url)?;
 let conn = client.get_connection_manager().await?;
 Ok(Self { conn })
 }

 /// Reads a raw string value, left untouched ("scalar strings pass through
 /// untouched").
 pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
 Ok(self.conn.clone().get(key).await?)
 }

 pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
 let mut conn = self.conn.clone();
 match ttl {
 Some(ttl) => conn.set_ex(key, value, ttl.as_secs().max(1)).await?,
 None => conn.set(key, value).await?,
 };
 Ok(())
 }

 /// Reads and JSON-decodes a compound value.
 pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
 let raw: Option<String> = self.get(key).await?;
 raw.map(|raw| {
 serde_json::from_str(&raw).map_err(|err| CacheError::Codec {
 key: key.to_string(),
 detail: err.to_string(),
 })
 })
 .transpose
 }

 /// JSON-encodes and writes a compound value.
 pub async fn set_json<T: Serialize>( &self,
 key: &str,
 value: &T,
 ttl: Option<Duration>,
) -> Result<(), CacheError> {
 let encoded = serde_json::to_string(value).map_err(|err| CacheError::Codec {
 key: key.to_string(),
 detail: err.to_string(),
 })?;
 self.set(key, &encoded, ttl).await
 }

 pub async fn del(&self, key: &str) -> Result<bool, CacheError> {
 let removed: u64 = self.conn.clone().del(key).await?;
 Ok(removed > 0)
 }

 pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
 Ok(self.conn.clone().exists(key).await?)
 }

 pub async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
 self.conn
 .clone()
 .expire(key, ttl.as_secs().max(1) as i64)
 .await?;
 Ok(())
 }

 pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError> {
 let seconds: i64 = self.conn.clone().ttl(key).await?;
 Ok((seconds > 0).then(|| Duration::from_secs(seconds as u64)))
 }

 /// Batch read; entries with no value are omitted rather than represented as `None`, since
 /// `MGET` returns a positional nil for each missing key and callers generally want only the
 /// hits.
 pub async fn get_many(&self, keys: &[String]) -> Result<Vec<(String, String)>, CacheError> {
 if keys.is_empty() {
 return Ok(Vec::new());
 }
 let values: Vec<Option<String>> = self.conn.clone().mget(keys).await?;
 Ok(keys
 .iter()
 .cloned()
 .zip(values)
 .filter_map(|(key, value)| value.map(|value| (key, value)))
 .collect())
 }

 pub async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
 if entries.is_empty() {
 return Ok(());
 }
 self.conn.clone().mset(entries).await?;
 Ok(())
 }

 pub async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
 if keys.is_empty() {
 return Ok(0);
 }
 Ok(self.conn.clone().del(keys).await?)
 }

 /// Deletes every key matching `prefix*` via non-blocking `SCAN`, safe to run against a live
 /// database (unlike `KEYS`, which blocks the server for the duration of the scan).
 pub async fn clear_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
 let pattern = format!("{prefix}*");
 let mut conn = self.conn.clone();
 let mut cursor: u64 = 0;
 let mut deleted = 0u64;

 loop {
 let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
 .arg(cursor)
 .arg("MATCH")
 .arg(&pattern)
 .arg("COUNT")
 .arg(200)
 .query_async(&mut conn)
 .await?;

 if !keys.is_empty() {
 deleted += conn.del::<_, u64>(&keys).await?;
 }
 cursor = next_cursor;
 if cursor == 0 {
 break;
 }
 }

 Ok(deleted)
 }

 // --- list primitives (priority queues, history) ---

 pub async fn list_push_right(&self, key: &str, value: &str) -> Result<(), CacheError> {
 self.conn.clone().rpush(key, value).await?;
 Ok(())
 }

 pub async fn list_push_left(&self, key: &str, value: &str) -> Result<(), CacheError> {
 self.conn.clone().lpush(key, value).await?;
 Ok(())
 }

 pub async fn list_pop_left(&self, key: &str) -> Result<Option<String>, CacheError> {
 Ok(self.conn.clone().lpop(key, None).await?)
 }

 pub async fn list_len(&self, key: &str) -> Result<u64, CacheError> {
 Ok(self.conn.clone().llen(key).await?)
 }

 pub async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
 Ok(self.conn.clone().lrange(key, start, stop).await?)
 }

 pub async fn list_trim(&self, key: &str, start: isize, stop: isize) -> Result<(), CacheError> {
 self.conn.clone().ltrim(key, start, stop).await?;
 Ok(())
 }

 // --- sorted-set primitives (scheduled jobs keyed by epoch millis) ---

 pub async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
 self.conn.clone().zadd(key, member, score).await?;
 Ok(())
 }

 pub async fn sorted_set_range_by_score( &self,
 key: &str,
 min: f64,
 max: f64,
) -> Result<Vec<String>, CacheError> {
 Ok(self.conn.clone().zrangebyscore(key, min, max).await?)
 }

 /// Removes `member` and reports whether this call was the one that actually removed it, so
 /// two callers racing to claim the same due job (e.g. the Job System's scheduled-job
 /// promotion) can tell who won.
 pub async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, CacheError> {
 let removed: u64 = self.conn.clone().zrem(key, member).await?;
 Ok(removed > 0)
 }

 // --- set primitives (processing set) ---

 pub async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
 self.conn.clone().sadd(key, member).await?;
 Ok(())
 }

 /// Atomically pops the head of `list_key` and adds it to `set_key` in one round trip, so no
 /// worker can observe the job popped from the queue but not yet claimed in the processing
 /// set ("no two workers ever claim the same job id simultaneously").
 pub async fn list_pop_left_and_set_add(&self, list_key: &str, set_key: &str) -> Result<Option<String>, CacheError> {
 const POP_AND_CLAIM: &str = r"
 local value = redis.call('LPOP', KEYS[1])
 if value then
 redis.call('SADD', KEYS[2], value)
 end
 return value
 ";
 let result: Option<String> = Script::new(POP_AND_CLAIM)
 .key(list_key)
 .key(set_key)
 .invoke_async(&mut self.conn.clone())
 .await?;
 Ok(result)
 }

 pub async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
 self.conn.clone().srem(key, member).await?;
 Ok(())
 }

 pub async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
 Ok(self.conn.clone().sismember(key, member).await?)
 }

 /// Conditional set: writes `value` only if `key` is absent, used for distributed locks and
 /// deduplication (e.g. `clientOrderId` idempotency gates). Returns whether the write took
 /// effect.
 pub async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
 const SET_NX_PX: &str = r"
 if redis.call('EXISTS', KEYS[1]) == 1 then
 return 0
 end
 redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
 return 1
 ";
 let result: i32 = Script::new(SET_NX_PX)
 .key(key)
 .arg(value)
 .arg(ttl.as_millis().max(1) as u64)
 .invoke_async(&mut self.conn.clone())
 .await?;
 Ok(result == 1)
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 /// Exercises only the pure request-shaping helpers; anything touching `ConnectionManager`
 /// needs a live Redis and belongs in an integration test, not this unit suite.
 #[test]
 fn clear_prefix_pattern_is_prefix_star() {
 assert_eq!(format!("{}*", "price"), "price*");
 }
}
