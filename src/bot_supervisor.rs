//! Spawns and drives one [`BotRuntime`] as an independent task ("Execution model":
//! "one task per bot"), since `BotRuntime` is generic over its placer/preflight/checkpoint
//! backend and can't be stored directly in a homogeneous registry without type erasure.

use ferrotrade_integration::Id;
use ferrotrade_strategy::{BotRuntime, BotStatus, CheckpointBackend, CheckpointStore, OrderPlacer, Preflight, RuntimeEvent, Strategy};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

/// A running bot's command channel plus its live status, the only two things the command
/// surface needs from outside the bot's own task.
pub struct BotHandle {
 events: mpsc::UnboundedSender<RuntimeEvent>,
 status: Arc<Mutex<BotStatus>>,
 task: JoinHandle<()>,
}

impl BotHandle {
 pub fn status(&self) -> BotStatus {
 *self.status.lock()
 }

 /// Best-effort: the bot's task may already have exited (e.g. after a terminal transition),
 /// in which case the send is dropped silently, matching a closed mailbox anywhere else in
 /// this codebase.
 pub fn send(&self, event: RuntimeEvent) {
 let _ = self.events.send(event);
 }

 pub fn abort(&self) {
 self.task.abort();
 }
}

#[allow(clippy::too_many_arguments)]
pub fn spawn<P, F, B>(
 bot_id: Id,
 user: Id,
 symbol: String,
 placer: Arc<P>,
 preflight: Arc<F>,
 checkpoints: Arc<CheckpointStore<B>>,
 strategy: Box<dyn Strategy>,
) -> BotHandle
where
 P: OrderPlacer + 'static,
 F: Preflight + 'static,
 B: CheckpointBackend + 'static,
{
 let (tx, mut rx) = mpsc::unbounded_channel::<RuntimeEvent>();
 let status = Arc::new(Mutex::new(BotStatus::Pending));
 let status_for_task = status.clone();

 let task = tokio::spawn(async move {
 let mut runtime = BotRuntime::new(bot_id, user, symbol, placer, preflight, checkpoints, strategy);
 if let Err(err) = runtime.restore().await {
 error!(%bot_id, %err, "failed to restore bot checkpoint on spawn");
 }
 *status_for_task.lock() = runtime.status();

 while let Some(event) = rx.recv().await {
 let alive = runtime.handle(event).await;
 *status_for_task.lock() = runtime.status();
 if !alive {
 break;
 }
 }
 });

 BotHandle { events: tx, status, task }
}
