//! The Control Plane: owns `Bot`, `ExchangeConnection` and `BacktestRun` records,
//! wires every other component together, and exposes the one command surface the rest of the
//! system (an HTTP/gRPC edge, a CLI, a test) drives.

use crate::bot_supervisor::{self, BotHandle};
use crate::config::Config;
use crate::crypto;
use crate::emergency_hooks::ControlPlaneEmergencyHooks;
use crate::entities::{BacktestRun, Bot, EntityStore, ExchangeConnection};
use crate::error::CoreError;
use crate::order_placer::RouterOrderPlacer;
use crate::reconciliation::ControlPlaneReconciliationQueue;
use crate::risk_gate::ControlPlaneRiskGate;
use crate::sweep_provider::ControlPlaneSweepProvider;

use chrono::Utc;
use ferrotrade_backtest::{BacktestConfig, BacktestEngine, Candle};
use ferrotrade_cache::Cache;
use ferrotrade_exchange::adapter::BinanceUsdFuturesAdapter;
use ferrotrade_exchange::model::ApiCredentials;
use ferrotrade_execution::{
 InMemoryOrderRepository, InMemorySymbolRegistry, NewOrderRequest, OrderRouter, SymbolRegistry,
};
use ferrotrade_instrument::{AssetName, Environment, ExchangeId, Symbol};
use ferrotrade_integration::Id;
use ferrotrade_jobs::{HandlerRegistry, InMemoryScheduledTaskStore, JobPriority, JobQueue, NewJob, Scheduler, WorkerPool};
use ferrotrade_portfolio::{InMemoryPortfolioRepository, PortfolioStore};
use ferrotrade_risk::{
 AlertSink, ContinuousSweep, EmergencyStop, RiskLimit, RiskLimitCatalog, RiskMetricsTracker, TracingAlertSink,
};
use ferrotrade_strategy::{
 build_strategy, AlwaysReady, BotCommand, BotStatus, CheckpointStore, RuntimeEvent, StrategyConfig,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub type UserRouter = OrderRouter<
 BinanceUsdFuturesAdapter,
 InMemoryOrderRepository,
 InMemoryPortfolioRepository,
 ControlPlaneRiskGate<InMemoryPortfolioRepository>,
 ControlPlaneReconciliationQueue,
>;

/// All shared state, held behind one `Arc` so the supporting seam implementations
/// ([`ControlPlaneEmergencyHooks`], [`ControlPlaneSweepProvider`]) can reference exactly the
/// same routers, entity stores and risk state the command surface itself reads and mutates.
pub(crate) struct Inner {
 pub config: Config,
 pub portfolio: Arc<PortfolioStore<InMemoryPortfolioRepository>>,
 pub symbols: Arc<dyn SymbolRegistry>,
 pub routers: Mutex<HashMap<Id, Arc<UserRouter>>>,
 pub connections: EntityStore<ExchangeConnection>,
 pub bots: EntityStore<Bot>,
 pub backtests: EntityStore<BacktestRun>,
 pub bot_handles: Mutex<HashMap<Id, BotHandle>>,
 pub limits: Arc<Mutex<HashMap<Id, RiskLimitCatalog>>>,
 pub metrics: Arc<Mutex<RiskMetricsTracker>>,
 pub alert_sink: Arc<dyn AlertSink>,
 pub market_data: ferrotrade_data::MarketDataHub<BinanceUsdFuturesAdapter>,
 pub distribution: ferrotrade_ws::Hub,
 pub job_queue: Arc<JobQueue>,
 pub margin_asset: AssetName,
 pub checkpoints: Cache,
}

pub struct ControlPlane {
 pub(crate) inner: Arc<Inner>,
 emergency: Arc<EmergencyStop<ControlPlaneEmergencyHooks>>,
 sweep: Arc<ContinuousSweep>,
 scheduler: Arc<Scheduler>,
 handlers: Arc<HandlerRegistry>,
 workers: Mutex<Option<WorkerPool>>,
 background: Mutex<Vec<JoinHandle<()>>>,
}

impl ControlPlane {
 /// Boots every component in dependency order: C3 Cache, C1 Exchange Adapter,
 /// C4 Portfolio Store first (nothing else can run without them); C2 Market-Data Hub, C5
 /// Risk Engine, C7 Job System next; C8/C9/C10 last, since they depend on everything above.
 pub async fn bootstrap(config: Config) -> Result<Arc<Self>, CoreError> {
 let checkpoints = Cache::connect(&config.cache_url).await?;
 let job_cache = Cache::connect(&config.cache_url).await?;

 let margin_asset = AssetName::new("USDT");
 let market_data_credentials = ApiCredentials {
 api_key: config.market_data_api_key.clone(),
 secret_key: config.market_data_api_secret.clone(),
 };
 let market_data_adapter = Arc::new(BinanceUsdFuturesAdapter::new(config.exchange_environment, market_data_credentials));

 let symbol_infos = market_data_adapter.get_symbols().await?;
 let symbols: Arc<dyn SymbolRegistry> = Arc::new(InMemorySymbolRegistry::new(symbol_infos.into_iter().map(|info| {
 let symbol = Symbol::new( ExchangeId::BinanceUsdFutures,
 info.base_asset,
 info.quote_asset,
 info.tick_size,
 info.lot_size,
 info.min_notional,
 info.price_precision,
 info.quantity_precision,
 if info.trading {
 ferrotrade_instrument::SymbolStatus::Trading
 } else {
 ferrotrade_instrument::SymbolStatus::Halted
 },
);
 (info.symbol, symbol)
 })));

 let portfolio = Arc::new(PortfolioStore::new(InMemoryPortfolioRepository::new()));
 let market_data = ferrotrade_data::MarketDataHub::new(ExchangeId::BinanceUsdFutures, market_data_adapter);
 let distribution = ferrotrade_ws::Hub::new();
 let job_queue = Arc::new(JobQueue::new(job_cache));
 let alert_sink: Arc<dyn AlertSink> = Arc::new(TracingAlertSink);

 let inner = Arc::new(Inner {
 config,
 portfolio,
 symbols,
 routers: Mutex::new(HashMap::new()),
 connections: EntityStore::new(),
 bots: EntityStore::new(),
 backtests: EntityStore::new(),
 bot_handles: Mutex::new(HashMap::new()),
 limits: Arc::new(Mutex::new(HashMap::new())),
 metrics: Arc::new(Mutex::new(RiskMetricsTracker::new())),
 alert_sink,
 market_data,
 distribution,
 job_queue,
 margin_asset,
 checkpoints,
 });

 let emergency = Arc::new(EmergencyStop::new(ControlPlaneEmergencyHooks { inner: inner.clone() }));
 let sweep_interval = inner.config.risk_sweep_interval;
 let sweep = Arc::new(ContinuousSweep::with_interval(inner.alert_sink.clone(), sweep_interval));

 let scheduler = Arc::new( Scheduler::new(Arc::new(InMemoryScheduledTaskStore::new()), inner.job_queue.clone())
 .with_tick_interval(inner.config.scheduler_tick),
);
 let mut handlers = HandlerRegistry::new();
 handlers.register( crate::reconciliation::RECONCILE_ORDER_JOB,
 Arc::new(crate::jobs::ReconcileOrderHandler { inner: inner.clone() }) as Arc<dyn ferrotrade_jobs::JobHandler>,
);

 Ok(Arc::new(Self {
 inner,
 emergency,
 sweep,
 scheduler,
 handlers: Arc::new(handlers),
 workers: Mutex::new(None),
 background: Mutex::new(Vec::new()),
 }))
 }

 /// Starts the background loops: the worker pool, the scheduler's own tick
 /// timer, and the continuous risk sweep. Idempotent in the same sense `Scheduler::start` is:
 /// calling it twice just logs and no-ops the second time.
 pub fn start(self: &Arc<Self>) {
 let mut workers = self.workers.lock();
 if workers.is_some() {
 warn!("control plane already started");
 return;
 }
 *workers = Some(WorkerPool::spawn(self.inner.config.worker_pool_size, self.inner.job_queue.clone(), self.handlers.clone()));
 drop(workers);

 if let Some(handle) = self.scheduler.clone().start() {
 self.background.lock().push(handle);
 }

 let sweep = self.sweep.clone();
 let provider = ControlPlaneSweepProvider { inner: self.inner.clone() };
 let emergency = self.emergency.clone();
 let handle = tokio::spawn(async move {
 sweep
 .start(provider, move |user| {
 let emergency = emergency.clone();
 tokio::spawn(async move {
 let _ = emergency.execute(user, "continuous sweep breach").await;
 });
 })
 .await;
 });
 self.background.lock().push(handle);

 info!("control plane started");
 }

 /// Shuts down in the reverse order `start` brought things up: bots first,
 /// then the job system, then the background loops; the Cache/Exchange Adapter connections
 /// are dropped with the process since neither exposes an explicit close.
 pub async fn shutdown(&self) {
 for (_, handle) in self.inner.bot_handles.lock().drain() {
 handle.send(RuntimeEvent::Command(BotCommand::Stop));
 handle.abort();
 }
 self.scheduler.stop();
 if let Some(workers) = self.workers.lock().take {
 workers.stop();
 workers.join().await;
 }
 for handle in self.background.lock().drain(..) {
 handle.abort();
 }
 info!("control plane shut down");
 }

 fn require_connection(&self, connection_id: Id, user: Id) -> Result<ExchangeConnection, CoreError> {
 self.inner
 .connections
 .get_owned(connection_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("exchange connection {connection_id}")))
 }

 /// Builds (or returns the cached) `OrderRouter` for `user`, from their most recently added
 /// `ExchangeConnection`. The control plane holds exactly one router per user: a second
 /// connection for the same venue replaces rather than multiplexes.
 fn router_for(&self, user: Id) -> Result<Arc<UserRouter>, CoreError> {
 if let Some(router) = self.inner.routers.lock().get(&user).cloned() {
 return Ok(router);
 }
 Err(CoreError::InvalidState("no exchange connection configured for this user".to_string()))
 }

 /// `POST /exchange-connections` (`ExchangeConnection`): stores the connection with
 /// its secret key encrypted at rest, and builds the user's `OrderRouter` from a decrypted
 /// credential set that is never retained past this call.
 pub fn create_exchange_connection( &self,
 user: Id,
 venue: ExchangeId,
 environment: Environment,
 api_key: String,
 secret_key: String,
 label: String,
) -> Result<ExchangeConnection, CoreError> {
 let encrypted = crypto::encrypt_secret(&self.inner.config.credential_encryption_key, &secret_key)
 .map_err(|err| CoreError::Internal(err.to_string()))?;
 let connection = ExchangeConnection::new(user, venue, environment, api_key.clone(), encrypted, label, Utc::now());
 self.inner.connections.insert(connection.clone());

 let adapter = Arc::new(BinanceUsdFuturesAdapter::new(environment, ApiCredentials { api_key, secret_key }));
 let risk_gate = ControlPlaneRiskGate::new( self.inner.portfolio.clone(),
 self.inner.limits.clone(),
 self.inner.metrics.clone(),
 {
 let market_data = self.inner.market_data.clone();
 Arc::new(move |symbol: &str| market_data.reference_price(symbol).unwrap_or_default())
 },
 self.inner.margin_asset.clone(),
);
 let reconciliation = ControlPlaneReconciliationQueue::new(self.inner.job_queue.clone());
 let router = Arc::new(OrderRouter::new( adapter,
 InMemoryOrderRepository::new(),
 self.inner.portfolio.clone(),
 self.inner.symbols.clone(),
 risk_gate,
 reconciliation,
 venue,
 self.inner.margin_asset.clone(),
));
 self.inner.routers.lock().insert(user, router);
 Ok(connection)
 }

 pub fn delete_exchange_connection(&self, user: Id, connection_id: Id) -> Result<(), CoreError> {
 self.require_connection(connection_id, user)?;
 self.inner.connections.remove_owned(connection_id, user);
 self.inner.routers.lock().remove(&user);
 Ok(())
 }

 /// Sets (replacing wholesale) the risk limit catalog a user's orders are checked against.
 pub fn set_risk_limits(&self, user: Id, limits: Vec<RiskLimit>) {
 let mut catalog = RiskLimitCatalog::new();
 for limit in limits {
 catalog.push(limit);
 }
 self.inner.limits.lock().insert(user, catalog);
 }

 pub fn risk_limits(&self, user: Id) -> RiskLimitCatalog {
 self.inner.limits.lock().get(&user).cloned().unwrap_or_default()
 }

 /// `POST /orders`: the control plane's direct (non-bot) order entry point.
 pub async fn place_order(&self, user: Id, request: NewOrderRequest) -> Result<Id, CoreError> {
 let router = self.router_for(user)?;
 Ok(router.place_order(user, request).await?)
 }

 pub async fn cancel_order(&self, user: Id, order_id: Id) -> Result<(), CoreError> {
 let router = self.router_for(user)?;
 router.cancel_order(order_id).await?;
 Ok(())
 }

 /// `POST /bots` (`Bot`): creates the record only, `Pending` until `start_bot`.
 pub fn create_bot(&self, user: Id, name: String, symbol: String, strategy: StrategyConfig) -> Result<Bot, CoreError> {
 build_strategy(&symbol, &strategy).map_err(|err| CoreError::Validation(err.to_string()))?;
 let bot = Bot::new(user, name, symbol, strategy, Utc::now());
 self.inner.bots.insert(bot.clone());
 Ok(bot)
 }

 pub fn delete_bot(&self, user: Id, bot_id: Id) -> Result<(), CoreError> {
 if self.inner.bot_handles.lock().contains_key(&bot_id) {
 return Err(CoreError::InvalidState("stop the bot before deleting it".to_string()));
 }
 self.inner
 .bots
 .remove_owned(bot_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("bot {bot_id}")))?;
 Ok(())
 }

 /// `POST /bots/{id}/start`: spawns the bot's runtime task and hands it the
 /// `Start` command.
 pub fn start_bot(&self, user: Id, bot_id: Id) -> Result<(), CoreError> {
 let bot = self
 .inner
 .bots
 .get_owned(bot_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("bot {bot_id}")))?;
 if self.inner.bot_handles.lock().contains_key(&bot_id) {
 return Err(CoreError::InvalidState("bot is already running".to_string()));
 }

 let strategy = build_strategy(&bot.symbol, &bot.strategy).map_err(|err| CoreError::Validation(err.to_string()))?;
 let router = self.router_for(user)?;
 let placer = Arc::new(RouterOrderPlacer::new(router));
 let checkpoints = Arc::new(CheckpointStore::new(self.inner.checkpoints.clone()));

 let handle = bot_supervisor::spawn(bot_id, user, bot.symbol.clone(), placer, Arc::new(AlwaysReady), checkpoints, strategy);
 handle.send(RuntimeEvent::Command(BotCommand::Start));
 self.inner.bot_handles.lock().insert(bot_id, handle);
 Ok(())
 }

 fn send_bot_command(&self, user: Id, bot_id: Id, command: BotCommand) -> Result<(), CoreError> {
 self.inner
 .bots
 .get_owned(bot_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("bot {bot_id}")))?;
 let handles = self.inner.bot_handles.lock();
 let handle = handles.get(&bot_id).ok_or_else(|| CoreError::InvalidState("bot is not running".to_string()))?;
 handle.send(RuntimeEvent::Command(command));
 Ok(())
 }

 pub fn pause_bot(&self, user: Id, bot_id: Id) -> Result<(), CoreError> {
 self.send_bot_command(user, bot_id, BotCommand::Pause)
 }

 pub fn resume_bot(&self, user: Id, bot_id: Id) -> Result<(), CoreError> {
 self.send_bot_command(user, bot_id, BotCommand::Resume)
 }

 pub fn stop_bot(&self, user: Id, bot_id: Id) -> Result<(), CoreError> {
 self.send_bot_command(user, bot_id, BotCommand::Stop)
 }

 pub fn bot_status(&self, user: Id, bot_id: Id) -> Result<BotStatus, CoreError> {
 self.inner
 .bots
 .get_owned(bot_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("bot {bot_id}")))?;
 Ok(self
 .inner
 .bot_handles
 .lock()
 .get(&bot_id)
 .map(|handle| handle.status)
 .unwrap_or(BotStatus::Pending))
 }

 pub fn list_bots(&self, user: Id) -> Vec<Bot> {
 self.inner.bots.list_for_user(user)
 }

 /// `POST /emergency-stop`: cancels every open order, closes every position
 /// reduce-only, and stops every bot for `user`.
 pub async fn emergency_stop(&self, user: Id, reason: impl Into<String>) -> Result<(), CoreError> {
 self.emergency.execute(user, reason).await?;
 Ok(())
 }

 /// `POST /jobs`: enqueues an arbitrary named job.
 pub async fn enqueue_job(&self, name: String, args: serde_json::Value, priority: JobPriority, user: Option<Id>) -> Result<Id, CoreError> {
 let mut job = NewJob::new(name, args).with_priority(priority);
 if let Some(user) = user {
 job = job.with_user(user);
 }
 Ok(self.inner.job_queue.enqueue(job).await?)
 }

 pub async fn job_status(&self, job_id: Id) -> Result<ferrotrade_jobs::Job, CoreError> {
 Ok(self.inner.job_queue.get(job_id).await?)
 }

 /// `POST /backtests`: runs synchronously against the supplied candle series and
 /// records the result, cancellable while in flight via the `CancelBacktest` handle returned
 /// by [`BacktestRun::id`] lookup.
 pub fn run_backtest(&self, user: Id, config: BacktestConfig, strategy: StrategyConfig, candles: Vec<Candle>) -> Result<Id, CoreError> {
 let mut run = BacktestRun::new(user, config.clone(), Utc::now());
 let run_id = run.id;
 self.inner.backtests.insert(run.clone());

 let strategy_impl = build_strategy(&config.symbol, &strategy).map_err(|err| CoreError::Validation(err.to_string()))?;
 let mut engine = BacktestEngine::new(config, strategy_impl);
 let cancel = Arc::new(AtomicBool::new(false));

 match engine.run(candles, cancel, |_progress| {}) {
 Ok(Some(result)) => {
 run.status = result.status;
 run.result = Some(result);
 }
 Ok(None) => run.status = ferrotrade_backtest::BacktestStatus::Cancelled,
 Err(err) => return Err(CoreError::Backtest(err)),
 }
 self.inner.backtests.replace_owned(run_id, user, run);
 Ok(run_id)
 }

 pub fn backtest_run(&self, user: Id, run_id: Id) -> Result<BacktestRun, CoreError> {
 self.inner
 .backtests
 .get_owned(run_id, user)
 .ok_or_else(|| CoreError::NotFound(format!("backtest run {run_id}")))
 }
}
