use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Executes one named job ("invokes the registered handler"). Failures are plain
/// strings rather than a shared error enum since handlers live across every crate in the
/// workspace and shouldn't all depend on one job-specific error taxonomy.
#[async_trait]
pub trait JobHandler: Send + Sync {
 async fn handle(&self, args: &serde_json::Value) -> Result<serde_json::Value, String>;
}

/// Maps a job's `name` to the handler that runs it.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
 handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
 self.handlers.insert(name.into(), handler);
 }

 pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
 self.handlers.get(name).cloned()
 }
}
