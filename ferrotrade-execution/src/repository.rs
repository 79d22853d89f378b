use crate::order::Order;
use ferrotrade_integration::Id;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Storage seam for the Order Router. Every order is handed out wrapped in its own `Arc<Mutex>`
/// so concurrent status updates for the *same* order serialize against each other (/// "guarded by a per-order mutex to prevent stale overwrites") without a single router-wide lock
/// serializing updates for unrelated orders.
pub trait OrderRepository: Send + Sync {
 fn insert(&self, order: Order) -> Arc<Mutex<Order>>;

 fn get(&self, id: Id) -> Option<Arc<Mutex<Order>>>;

 fn get_by_client_order_id(&self, client_order_id: &str) -> Option<Arc<Mutex<Order>>>;

 fn open_orders(&self, user: Id, symbol: Option<&str>) -> Vec<Order>;
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
 by_id: RwLock<HashMap<Id, Arc<Mutex<Order>>>>,
 by_client_order_id: RwLock<HashMap<String, Id>>,
}

impl InMemoryOrderRepository {
 pub fn new() -> Self {
 Self::default()
 }
}

impl OrderRepository for InMemoryOrderRepository {
 fn insert(&self, order: Order) -> Arc<Mutex<Order>> {
 let id = order.id;
 let client_order_id = order.client_order_id.clone();
 let handle = Arc::new(Mutex::new(order));
 self.by_id.write().insert(id, handle.clone());
 self.by_client_order_id.write().insert(client_order_id, id);
 handle
 }

 fn get(&self, id: Id) -> Option<Arc<Mutex<Order>>> {
 self.by_id.read().get(&id).cloned()
 }

 fn get_by_client_order_id(&self, client_order_id: &str) -> Option<Arc<Mutex<Order>>> {
 let id = *self.by_client_order_id.read().get(client_order_id)?;
 self.get(id)
 }

 fn open_orders(&self, user: Id, symbol: Option<&str>) -> Vec<Order> {
 self.by_id
 .read()
 .values()
 .filter_map(|handle| {
 let order = handle.lock();
 let matches_user = order.user == user;
 let matches_symbol = symbol.map(|symbol| symbol == order.symbol).unwrap_or(true);
 (matches_user && matches_symbol && order.is_cancellable()).then(|| order.clone())
 })
 .collect()
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::state_machine::OrderStatus;
 use chrono::Utc;
 use ferrotrade_exchange::model::{OrderType, Side};
 use ferrotrade_instrument::ExchangeId;
 use rust_decimal::Decimal;

 fn new_order(user: Id, symbol: &str, status: OrderStatus) -> Order {
 Order {
 id: Id::new(),
 user,
 venue: ExchangeId::BinanceUsdFutures,
 symbol: symbol.to_string(),
 client_order_id: format!("c-{}", Id::new()),
 venue_order_id: None,
 side: Side::Buy,
 order_type: OrderType::Market,
 time_in_force: None,
 quantity: Decimal::ONE,
 price: None,
 reduce_only: false,
 status,
 filled_quantity: Decimal::ZERO,
 last_venue_trade_id: None,
 created_at: Utc::now(),
 updated_at: Utc::now(),
 }
 }

 #[test]
 fn get_by_client_order_id_finds_a_previously_inserted_order() {
 let repository = InMemoryOrderRepository::new();
 let user = Id::new();
 let order = new_order(user, "BTCUSDT", OrderStatus::Pending);
 let client_order_id = order.client_order_id.clone();
 repository.insert(order);

 assert!(repository.get_by_client_order_id(&client_order_id).is_some());
 }

 #[test]
 fn open_orders_excludes_terminal_states() {
 let repository = InMemoryOrderRepository::new();
 let user = Id::new();
 repository.insert(new_order(user, "BTCUSDT", OrderStatus::New));
 repository.insert(new_order(user, "BTCUSDT", OrderStatus::Filled));

 let open = repository.open_orders(user, None);
 assert_eq!(open.len(), 1);
 assert_eq!(open[0].status, OrderStatus::New);
 }
}
