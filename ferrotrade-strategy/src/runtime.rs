//! Drives one Bot instance ("Execution model"): a cooperative task reading an event
//! mailbox, applying the declared per-tick wall-clock budget, checkpointing strategy state to
//! Cache after each tick, and forwarding the strategy's `StrategyAction`s to the Order Router
//! through the [`OrderPlacer`] seam (so this crate never needs `ferrotrade-execution`'s
//! `OrderRouter` generic parameters in scope).

use crate::checkpoint::{CheckpointBackend, CheckpointStore};
use crate::error::StrategyError;
use crate::state_machine::{next_status, BotStatus, StateEvent};
use crate::strategy::{Strategy, StrategyAction, TickEvent};
use async_trait::async_trait;
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_integration::Id;
use ferrotrade_portfolio::Position;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_TICK_BUDGET: Duration = Duration::from_millis(250);
pub const MAX_CONSECUTIVE_OVERRUNS: u32 = 3;
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Submits/cancels orders on the bot's behalf. The real implementor wraps an
/// `OrderRouter<A, OR, PR, RG, RQ>`; tests use a fake.
#[async_trait]
pub trait OrderPlacer: Send + Sync {
 async fn place_order(&self, user: Id, request: NewOrderRequest) -> Result<Id, String>;
 async fn cancel_order(&self, order_id: Id) -> Result<(), String>;
}

/// The bot's pre-flight gate (`start`): "connection validity, symbol existence,
/// sufficient balance, subscribed data channels." Returns the names of failed checks; empty
/// means ready to go active.
#[async_trait]
pub trait Preflight: Send + Sync {
 async fn run(&self, user: Id, symbol: &str) -> Vec<String>;
}

#[derive(Debug, Default)]
pub struct AlwaysReady;

#[async_trait]
impl Preflight for AlwaysReady {
 async fn run(&self, _user: Id, _symbol: &str) -> Vec<String> {
 Vec::new()
 }
}

/// External commands the Control Plane's command surface drives a running bot with.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BotCommand {
 Start,
 Pause,
 Resume,
 Stop,
}

/// One item on a bot's event mailbox (market events, order updates, position
/// updates, timer ticks, plus the lifecycle commands that drive the state machine).
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
 Tick(TickEvent),
 OrderUpdate(Order),
 PositionUpdate(Position),
 Command(BotCommand),
}

pub struct BotRuntime<P: OrderPlacer, F: Preflight, B: CheckpointBackend> {
 bot_id: Id,
 user: Id,
 symbol: String,
 placer: Arc<P>,
 preflight: Arc<F>,
 checkpoints: Arc<CheckpointStore<B>>,
 strategy: Box<dyn Strategy>,
 status: BotStatus,
 tick_budget: Duration,
 consecutive_overruns: u32,
 consecutive_failures: u32,
 open_orders: HashSet<Id>,
}

impl<P: OrderPlacer, F: Preflight, B: CheckpointBackend> BotRuntime<P, F, B> {
 pub fn new( bot_id: Id,
 user: Id,
 symbol: impl Into<String>,
 placer: Arc<P>,
 preflight: Arc<F>,
 checkpoints: Arc<CheckpointStore<B>>,
 strategy: Box<dyn Strategy>,
) -> Self {
 Self {
 bot_id,
 user,
 symbol: symbol.into(),
 placer,
 preflight,
 checkpoints,
 strategy,
 status: BotStatus::Pending,
 tick_budget: DEFAULT_TICK_BUDGET,
 consecutive_overruns: 0,
 consecutive_failures: 0,
 open_orders: HashSet::new(),
 }
 }

 pub fn with_tick_budget(mut self, budget: Duration) -> Self {
 self.tick_budget = budget;
 self
 }

 pub fn status(&self) -> BotStatus {
 self.status
 }

 /// Loads a prior checkpoint, if one exists ("on crash, the Control Plane
 /// respawns bots ... and loads the last checkpoint").
 pub async fn restore(&mut self) -> Result<(), StrategyError> {
 if let Some(state) = self.checkpoints.load(self.bot_id).await? {
 self.strategy.restore(state);
 }
 Ok(())
 }

 fn transition(&mut self, event: StateEvent) {
 match next_status(self.status, event) {
 Ok(next) => {
 info!(bot_id = %self.bot_id, from = ?self.status, to = ?next, ?event, "bot state transition");
 self.status = next;
 }
 Err(err) => warn!(bot_id = %self.bot_id, %err, "dropped invalid bot transition"),
 }
 }

 /// Handles one mailbox item, returning `false` once the bot has reached a terminal state
 /// and its task should exit.
 pub async fn handle(&mut self, event: RuntimeEvent) -> bool {
 match event {
 RuntimeEvent::Command(BotCommand::Start) => self.start().await,
 RuntimeEvent::Command(BotCommand::Pause) => self.transition(StateEvent::Pause),
 RuntimeEvent::Command(BotCommand::Resume) => self.transition(StateEvent::Resume),
 RuntimeEvent::Command(BotCommand::Stop) => self.stop().await,
 RuntimeEvent::Tick(tick) if self.status == BotStatus::Active => self.run_tick(tick).await,
 RuntimeEvent::OrderUpdate(order) => self.handle_order_update(order).await,
 RuntimeEvent::PositionUpdate(position) => self.dispatch(self.strategy.on_position_update(&position)).await,
 _ => {}
 }
 !self.status.is_terminal()
 }

 async fn start(&mut self) {
 self.transition(StateEvent::Start);
 if self.status != BotStatus::Starting {
 return;
 }
 let failed = self.preflight.run(self.user, &self.symbol).await;
 if failed.is_empty() {
 self.transition(StateEvent::PreflightPassed);
 } else {
 warn!(bot_id = %self.bot_id, ?failed, "bot pre-flight failed");
 self.transition(StateEvent::PreflightFailed);
 }
 }

 async fn stop(&mut self) {
 self.transition(StateEvent::Stop);
 if self.status != BotStatus::Stopping {
 return;
 }
 for order_id in self.open_orders.drain().collect::<Vec<_>>() {
 if let Err(err) = self.placer.cancel_order(order_id).await {
 warn!(bot_id = %self.bot_id, %order_id, %err, "failed to cancel order during bot stop");
 }
 }
 self.transition(StateEvent::StopCompleted);
 }

 async fn handle_order_update(&mut self, order: Order) {
 if order.status.is_terminal() {
 self.open_orders.remove(&order.id);
 } else {
 self.open_orders.insert(order.id);
 }
 self.dispatch(self.strategy.on_order_update(&order)).await;
 }

 /// Runs one market/timer tick under the per-tick wall-clock budget (default
 /// 250 ms; sustained overruns pause the bot; an unhandled failure transitions to `error`).
 async fn run_tick(&mut self, tick: TickEvent) {
 let started = Instant::now();
 let actions = self.strategy.on_tick(&tick);
 let elapsed = started.elapsed();

 if elapsed > self.tick_budget {
 self.consecutive_overruns += 1;
 warn!(bot_id = %self.bot_id, ?elapsed, budget = ?self.tick_budget, "bot tick exceeded its wall-clock budget");
 if self.consecutive_overruns >= MAX_CONSECUTIVE_OVERRUNS {
 warn!(bot_id = %self.bot_id, "pausing bot after sustained tick overruns");
 self.transition(StateEvent::Pause);
 self.consecutive_overruns = 0;
 return;
 }
 } else {
 self.consecutive_overruns = 0;
 }

 self.dispatch(actions).await;

 if let Err(err) = self.checkpoints.save(self.bot_id, &self.strategy.checkpoint).await {
 error!(bot_id = %self.bot_id, %err, "failed to persist bot checkpoint");
 }
 }

 async fn dispatch(&mut self, actions: Vec<StrategyAction>) {
 for action in actions {
 let result = match action {
 StrategyAction::PlaceOrder(request) => {
 match self.placer.place_order(self.user, request).await {
 Ok(order_id) => {
 self.open_orders.insert(order_id);
 Ok(())
 }
 Err(err) => Err(err),
 }
 }
 StrategyAction::CancelOrder(order_id) => self.placer.cancel_order(order_id).await,
 };

 match result {
 Ok(()) => self.consecutive_failures = 0,
 Err(err) => {
 self.consecutive_failures += 1;
 error!(bot_id = %self.bot_id, %err, consecutive_failures = self.consecutive_failures, "bot action failed");
 if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
 self.transition(StateEvent::Fail);
 }
 }
 }
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::checkpoint::test_support::InMemoryBackend;
 use crate::strategies::GridStrategy;
 use crate::strategy::MarketTick;
 use chrono::Utc;
 use ferrotrade_execution::OrderStatus;
 use parking_lot::Mutex;
 use rust_decimal_macros::dec;

 struct FakePlacer {
 fail: bool,
 placed: Mutex<Vec<NewOrderRequest>>,
 cancelled: Mutex<Vec<Id>>,
 }

 impl FakePlacer {
 fn new(fail: bool) -> Self {
 Self { fail, placed: Mutex::new(Vec::new()), cancelled: Mutex::new(Vec::new()) }
 }
 }

 #[async_trait]
 impl OrderPlacer for FakePlacer {
 async fn place_order(&self, _user: Id, request: NewOrderRequest) -> Result<Id, String> {
 if self.fail {
 return Err("rejected".to_string());
 }
 self.placed.lock().push(request);
 Ok(Id::new())
 }

 async fn cancel_order(&self, order_id: Id) -> Result<(), String> {
 self.cancelled.lock().push(order_id);
 Ok(())
 }
 }

 struct RejectingPreflight;

 #[async_trait]
 impl Preflight for RejectingPreflight {
 async fn run(&self, _user: Id, _symbol: &str) -> Vec<String> {
 vec!["insufficient-balance".to_string()]
 }
 }

 /// Places one market buy every tick, unlike the built-in strategies which act selectively;
 /// used to drive deterministic per-tick dispatch counts in the tests below.
 struct AlwaysBuyStrategy;

 impl Strategy for AlwaysBuyStrategy {
 fn on_tick(&mut self, _event: &TickEvent) -> Vec<StrategyAction> {
 vec![StrategyAction::PlaceOrder(NewOrderRequest {
 symbol: "BTCUSDT".to_string(),
 side: ferrotrade_exchange::model::Side::Buy,
 order_type: ferrotrade_exchange::model::OrderType::Market,
 time_in_force: None,
 quantity: dec!(1),
 price: None,
 reduce_only: false,
 reference_price: dec!(100),
 })]
 }

 fn on_order_update(&mut self, _order: &Order) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn on_position_update(&mut self, _position: &ferrotrade_portfolio::Position) -> Vec<StrategyAction> {
 Vec::new()
 }

 fn checkpoint(&self) -> serde_json::Value {
 serde_json::json!({})
 }

 fn restore(&mut self, _state: serde_json::Value) {}
 }

 fn grid_strategy() -> Box<dyn Strategy> {
 Box::new(GridStrategy::new( "BTCUSDT".to_string(),
 crate::model::GridParams {
 lower_price: dec!(90),
 upper_price: dec!(110),
 grid_count: 4,
 quantity_per_grid: dec!(1),
 take_profit_percent: None,
 stop_loss_percent: None,
 },
))
 }

 fn runtime( placer: Arc<FakePlacer>,
 preflight: Arc<AlwaysReady>,
) -> BotRuntime<FakePlacer, AlwaysReady, InMemoryBackend> {
 BotRuntime::new( Id::new(),
 Id::new(),
 "BTCUSDT",
 placer,
 preflight,
 Arc::new(CheckpointStore::new(InMemoryBackend::default())),
 grid_strategy,
)
 }

 fn market_tick(price: rust_decimal::Decimal) -> RuntimeEvent {
 RuntimeEvent::Tick(TickEvent::Market(MarketTick {
 symbol: "BTCUSDT".to_string(),
 price,
 event_time: Utc::now(),
 }))
 }

 #[tokio::test]
 async fn start_with_passing_preflight_reaches_active() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = runtime(placer, Arc::new(AlwaysReady));
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;
 assert_eq!(bot.status, BotStatus::Active);
 }

 #[tokio::test]
 async fn start_with_failing_preflight_stops_the_bot() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = BotRuntime::new( Id::new(),
 Id::new(),
 "BTCUSDT",
 placer,
 Arc::new(RejectingPreflight),
 Arc::new(CheckpointStore::new(InMemoryBackend::default())),
 grid_strategy,
);
 let alive = bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;
 assert_eq!(bot.status, BotStatus::Stopped);
 assert!(!alive);
 }

 #[tokio::test]
 async fn a_tick_while_active_places_grid_orders_and_checkpoints() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = runtime(placer.clone(), Arc::new(AlwaysReady));
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;
 bot.handle(market_tick(dec!(100))).await;
 assert_eq!(placer.placed.lock().len(), 2);
 assert!(bot.checkpoints.load(bot.bot_id).await.unwrap().is_some());
 }

 #[tokio::test]
 async fn stop_cancels_all_tracked_open_orders() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = runtime(placer.clone(), Arc::new(AlwaysReady));
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;
 bot.handle(market_tick(dec!(100))).await;
 assert!(!bot.open_orders.is_empty());

 let alive = bot.handle(RuntimeEvent::Command(BotCommand::Stop)).await;
 assert_eq!(bot.status, BotStatus::Stopped);
 assert!(!alive);
 assert!(!placer.cancelled.lock().is_empty());
 assert!(bot.open_orders.is_empty());
 }

 #[tokio::test]
 async fn an_order_update_tracks_open_orders_by_terminal_status() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = runtime(placer, Arc::new(AlwaysReady));
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;

 let mut order = sample_order();
 order.status = OrderStatus::New;
 bot.handle(RuntimeEvent::OrderUpdate(order.clone())).await;
 assert!(bot.open_orders.contains(&order.id));

 order.status = OrderStatus::Filled;
 bot.handle(RuntimeEvent::OrderUpdate(order.clone())).await;
 assert!(!bot.open_orders.contains(&order.id));
 }

 #[tokio::test]
 async fn three_consecutive_tick_overruns_pause_the_bot() {
 let placer = Arc::new(FakePlacer::new(false));
 let mut bot = runtime(placer, Arc::new(AlwaysReady)).with_tick_budget(Duration::from_nanos(1));
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;

 for i in 0..MAX_CONSECUTIVE_OVERRUNS {
 bot.handle(market_tick(dec!(100) + rust_decimal::Decimal::from(i))).await;
 }
 assert_eq!(bot.status, BotStatus::Paused);
 }

 #[tokio::test]
 async fn three_consecutive_action_failures_fail_the_bot() {
 let placer = Arc::new(FakePlacer::new(true));
 let mut bot = BotRuntime::new( Id::new(),
 Id::new(),
 "BTCUSDT",
 placer,
 Arc::new(AlwaysReady),
 Arc::new(CheckpointStore::new(InMemoryBackend::default())),
 Box::new(AlwaysBuyStrategy),
);
 bot.handle(RuntimeEvent::Command(BotCommand::Start)).await;

 for i in 0..MAX_CONSECUTIVE_FAILURES {
 bot.handle(market_tick(dec!(100) + rust_decimal::Decimal::from(i))).await;
 }
 assert_eq!(bot.status, BotStatus::Error);
 }

 fn sample_order() -> Order {
 Order {
 id: Id::new(),
 user: Id::new(),
 venue: ferrotrade_instrument::ExchangeId::BinanceUsdFutures,
 symbol: "BTCUSDT".to_string(),
 client_order_id: "test-client-order-id".to_string(),
 venue_order_id: None,
 side: ferrotrade_exchange::model::Side::Buy,
 order_type: ferrotrade_exchange::model::OrderType::Limit,
 time_in_force: Some(ferrotrade_exchange::model::TimeInForce::GoodTilCanceled),
 quantity: dec!(1),
 price: Some(dec!(100)),
 reduce_only: false,
 status: OrderStatus::New,
 filled_quantity: dec!(0),
 last_venue_trade_id: None,
 created_at: Utc::now(),
 updated_at: Utc::now(),
 }
 }
}
