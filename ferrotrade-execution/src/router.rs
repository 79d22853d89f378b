use crate::client_order_id::generate_client_order_id;
use crate::error::ExecutionError;
use crate::order::Order;
use crate::repository::OrderRepository;
use crate::state_machine::{next_status, OrderEvent, OrderStatus};
use chrono::Utc;
use ferrotrade_exchange::model::{
 CancelOrderRequest, OrderType, PlaceOrderRequest, Side, TimeInForce, VenueOrderStatus,
};
use ferrotrade_exchange::{ExchangeAdapter, ExchangeError};
use ferrotrade_instrument::{AssetName, ExchangeId, Symbol};
use ferrotrade_integration::Id;
use ferrotrade_portfolio::{Fill as PortfolioFill, PortfolioRepository, PortfolioStore, Side as PortfolioSide};
use ferrotrade_risk::OrderRiskDecision;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A caller's request to open a new position or add to/reduce one (the router's input before
/// normalization). `reference_price` is used only to project notional for market orders, which
/// carry no `price` of their own.
#[derive(Debug, Clone)]
pub struct NewOrderRequest {
 pub symbol: String,
 pub side: Side,
 pub order_type: OrderType,
 pub time_in_force: Option<TimeInForce>,
 pub quantity: Decimal,
 pub price: Option<Decimal>,
 pub reduce_only: bool,
 pub reference_price: Decimal,
}

/// Looks up static instrument reference data by symbol (step 1's normalization
/// authority). Populated from `ExchangeAdapter::get_symbols` at startup.
pub trait SymbolRegistry: Send + Sync {
 fn get(&self, symbol: &str) -> Option<Symbol>;
}

#[derive(Debug, Default)]
pub struct InMemorySymbolRegistry {
 symbols: HashMap<String, Symbol>,
}

impl InMemorySymbolRegistry {
 pub fn new(symbols: impl IntoIterator<Item = (String, Symbol)>) -> Self {
 Self { symbols: symbols.into_iter().collect() }
 }
}

impl SymbolRegistry for InMemorySymbolRegistry {
 fn get(&self, symbol: &str) -> Option<Symbol> {
 self.symbols.get(symbol).cloned()
 }
}

/// The synchronous pre-trade risk check (step 3), decoupled from a concrete Risk
/// Engine wiring so the router doesn't need to know how metrics/limits are assembled.
pub trait RiskGate: Send + Sync {
 fn evaluate_new_order(&self, user: Id, request: &PlaceOrderRequest) -> OrderRiskDecision;
}

/// Enqueues a high-priority reconciliation job when a SIGNED request's outcome is unknown
/// (step 5). The Job System (C7) is the real implementor; tests use a no-op.
pub trait ReconciliationQueue: Send + Sync {
 fn enqueue_high_priority(&self, order_id: Id);
}

#[derive(Debug, Default)]
pub struct NoopReconciliationQueue;

impl ReconciliationQueue for NoopReconciliationQueue {
 fn enqueue_high_priority(&self, _order_id: Id) {}
}

fn venue_status_event(status: VenueOrderStatus) -> OrderEvent {
 match status {
 VenueOrderStatus::New => OrderEvent::VenueAcked,
 VenueOrderStatus::PartiallyFilled => OrderEvent::PartialFill,
 VenueOrderStatus::Filled => OrderEvent::FullFill,
 VenueOrderStatus::Canceled => OrderEvent::CancelRequested,
 VenueOrderStatus::Rejected => OrderEvent::VenueRejected,
 VenueOrderStatus::Expired => OrderEvent::TimeInForceExpired,
 }
}

/// Orchestrates the Order Router: normalizes and risk-gates new orders, submits
/// them to an `ExchangeAdapter`, applies venue status updates and fills under a table-driven
/// state machine, and forwards fills to the Portfolio Store.
pub struct OrderRouter<A, OR, PR, RG, RQ>
where
 A: ExchangeAdapter,
 OR: OrderRepository,
 PR: PortfolioRepository,
 RG: RiskGate,
 RQ: ReconciliationQueue,
{
 adapter: Arc<A>,
 orders: OR,
 portfolio: Arc<PortfolioStore<PR>>,
 symbols: Arc<dyn SymbolRegistry>,
 risk_gate: RG,
 reconciliation: RQ,
 venue: ExchangeId,
 margin_asset: AssetName,
}

impl<A, OR, PR, RG, RQ> OrderRouter<A, OR, PR, RG, RQ>
where
 A: ExchangeAdapter,
 OR: OrderRepository,
 PR: PortfolioRepository,
 RG: RiskGate,
 RQ: ReconciliationQueue,
{
 #[allow(clippy::too_many_arguments)]
 pub fn new( adapter: Arc<A>,
 orders: OR,
 portfolio: Arc<PortfolioStore<PR>>,
 symbols: Arc<dyn SymbolRegistry>,
 risk_gate: RG,
 reconciliation: RQ,
 venue: ExchangeId,
 margin_asset: AssetName,
) -> Self {
 Self { adapter, orders, portfolio, symbols, risk_gate, reconciliation, venue, margin_asset }
 }

 /// `placeOrder`: normalize → generate clientOrderId → risk gate → persist
 /// pending → submit → update.
 pub async fn place_order(&self, user: Id, request: NewOrderRequest) -> Result<Id, ExecutionError> {
 let symbol = self
 .symbols
 .get(&request.symbol)
 .ok_or_else(|| ExecutionError::Validation(format!("unknown symbol {}", request.symbol)))?;

 let price_for_checks = request.price.unwrap_or(request.reference_price);
 let (normalized_price, normalized_quantity) = symbol.normalize_order(price_for_checks, request.quantity)?;

 let client_order_id = generate_client_order_id(user, Utc::now(), rand::random::<u64>());

 let venue_request = PlaceOrderRequest {
 client_order_id: client_order_id.clone(),
 symbol: request.symbol.clone(),
 side: request.side,
 order_type: request.order_type,
 time_in_force: request.time_in_force,
 quantity: normalized_quantity,
 price: request.price.map(|_| normalized_price),
 reduce_only: request.reduce_only,
 };

 match self.risk_gate.evaluate_new_order(user, &venue_request) {
 OrderRiskDecision::Violation { limit } => return Err(ExecutionError::RiskViolation { limit }),
 OrderRiskDecision::Warning { limits } => {
 warn!(%user, symbol = %request.symbol, ?limits, "order permitted with risk warning");
 }
 OrderRiskDecision::Allowed => {}
 }

 let now = Utc::now();
 let order = Order {
 id: Id::new(),
 user,
 venue: self.venue,
 symbol: request.symbol.clone(),
 client_order_id: client_order_id.clone(),
 venue_order_id: None,
 side: request.side,
 order_type: request.order_type,
 time_in_force: request.time_in_force,
 quantity: normalized_quantity,
 price: request.price.map(|_| normalized_price),
 reduce_only: request.reduce_only,
 status: OrderStatus::Pending,
 filled_quantity: Decimal::ZERO,
 last_venue_trade_id: None,
 created_at: now,
 updated_at: now,
 };
 let order_id = order.id;
 let handle = self.orders.insert(order);

 match self.adapter.place_order(venue_request).await {
 Ok(ack) => {
 let mut order = handle.lock();
 order.venue_order_id = Some(ack.venue_order_id);
 self.transition(&mut order, venue_status_event(ack.status));
 info!(%user, order_id = %order_id, symbol = %order.symbol, "order-placed");
 Ok(order_id)
 }
 Err(ExchangeError::ExchangeUnknown { .. }) => {
 self.reconciliation.enqueue_high_priority(order_id);
 warn!(%user, order_id = %order_id, "order outcome unknown, enqueued reconciliation and returning provisional id");
 Ok(order_id)
 }
 Err(err @ ExchangeError::ExchangeRejected { .. }) => {
 let mut order = handle.lock();
 self.transition(&mut order, OrderEvent::VenueRejected);
 Err(ExecutionError::Exchange(err))
 }
 Err(err) => Err(ExecutionError::Exchange(err)),
 }
 }

 /// Every order for `user` (optionally narrowed to one symbol) still in a cancellable state.
 /// Used by callers that need to act on a user's whole open-order set at once, e.g. an
 /// emergency stop.
 pub fn open_orders(&self, user: Id, symbol: Option<&str>) -> Vec<Order> {
 self.orders.open_orders(user, symbol)
 }

 /// Cancels an open order at the venue and transitions it locally once requested.
 pub async fn cancel_order(&self, order_id: Id) -> Result<(), ExecutionError> {
 let handle = self.orders.get(order_id).ok_or_else(|| ExecutionError::NotFound(order_id.to_string()))?;

 let (symbol, venue_order_id, client_order_id) = {
 let order = handle.lock();
 if !order.is_cancellable() {
 return Err(ExecutionError::NotCancellable(order_id.to_string()));
 }
 (order.symbol.clone(), order.venue_order_id.clone(), order.client_order_id.clone())
 };

 self.adapter
 .cancel_order(CancelOrderRequest {
 symbol,
 venue_order_id,
 client_order_id: Some(client_order_id),
 })
 .await?;

 let mut order = handle.lock();
 self.transition(&mut order, OrderEvent::CancelRequested);
 Ok(())
 }

 /// `reconcileOrder`: idempotent sync from venue, callable any number of times.
 pub async fn reconcile_order(&self, order_id: Id) -> Result<OrderStatus, ExecutionError> {
 let handle = self.orders.get(order_id).ok_or_else(|| ExecutionError::NotFound(order_id.to_string()))?;
 let (symbol, venue_order_id) = {
 let order = handle.lock();
 (order.symbol.clone(), order.venue_order_id.clone())
 };
 let venue_order_id = venue_order_id.ok_or_else(|| ExecutionError::NotFound(order_id.to_string()))?;

 let ack = self.adapter.get_order(&symbol, &venue_order_id).await?;
 let mut order = handle.lock();
 self.transition(&mut order, venue_status_event(ack.status));
 Ok(order.status)
 }

 /// Applies a User Data Stream order-status event ("primary source of order
 /// status events"). Looked up by venue `clientOrderId`, since that's what the stream
 /// reports and what this router generated.
 pub fn apply_order_update(&self, client_order_id: &str, status: VenueOrderStatus) -> Result<(), ExecutionError> {
 let handle = self
 .orders
 .get_by_client_order_id(client_order_id)
 .ok_or_else(|| ExecutionError::NotFound(client_order_id.to_string()))?;
 let mut order = handle.lock();
 self.transition(&mut order, venue_status_event(status));
 Ok(())
 }

 /// Applies one fill, notifying the Portfolio Store with (orderId, price, qty, fee,
 /// feeAsset), after the tie-break rule on `venue_trade_id`: an equal trade id to the
 /// last one applied is a duplicate and skipped.
 #[allow(clippy::too_many_arguments)]
 pub fn apply_fill(
 &self,
 client_order_id: &str,
 price: Decimal,
 quantity: Decimal,
 fee: Decimal,
 fee_asset: AssetName,
 venue_trade_id: u64,
 venue_timestamp: chrono::DateTime<Utc>,
) -> Result<(), ExecutionError> {
 let handle = self
 .orders
 .get_by_client_order_id(client_order_id)
 .ok_or_else(|| ExecutionError::NotFound(client_order_id.to_string()))?;

 let (user, symbol, venue, side) = {
 let mut order = handle.lock();
 if order.last_venue_trade_id == Some(venue_trade_id) {
 return Ok(());
 }
 order.last_venue_trade_id = Some(venue_trade_id);
 order.filled_quantity += quantity;
 let event = if order.filled_quantity >= order.quantity {
 OrderEvent::FullFill
 } else {
 OrderEvent::PartialFill
 };
 self.transition(&mut order, event);
 (order.user, order.symbol.clone(), order.venue, order.side)
 };

 let portfolio_side = match side {
 Side::Buy => PortfolioSide::Buy,
 Side::Sell => PortfolioSide::Sell,
 };

 self.portfolio.apply_fill( user,
 venue,
 &symbol,
 &self.margin_asset,
 PortfolioFill {
 side: portfolio_side,
 price,
 quantity,
 fee,
 fee_asset,
 venue_trade_id,
 venue_timestamp,
 },
)?;
 Ok(())
 }

 fn transition(&self, order: &mut Order, event: OrderEvent) {
 match next_status(order.status, event) {
 Ok(status) => {
 order.status = status;
 order.updated_at = Utc::now();
 }
 Err(invalid) => {
 warn!(order_id = %order.id, current = ?invalid.current, event = ?invalid.event, "dropped illegal order status transition");
 }
 }
 }
}
