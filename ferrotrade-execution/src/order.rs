use crate::state_machine::OrderStatus;
use chrono::{DateTime, Utc};
use ferrotrade_exchange::model::{OrderType, Side, TimeInForce};
use ferrotrade_instrument::ExchangeId;
use ferrotrade_integration::Id;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The router's persisted record of one order: tracked from `pending` through to a
/// terminal state, and the unit the per-order mutex in [`crate::repository::OrderRepository`]
/// guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
 pub id: Id,
 pub user: Id,
 pub venue: ExchangeId,
 pub symbol: String,
 pub client_order_id: String,
 pub venue_order_id: Option<String>,
 pub side: Side,
 pub order_type: OrderType,
 pub time_in_force: Option<TimeInForce>,
 pub quantity: Decimal,
 pub price: Option<Decimal>,
 pub reduce_only: bool,
 pub status: OrderStatus,
 pub filled_quantity: Decimal,
 pub last_venue_trade_id: Option<u64>,
 pub created_at: DateTime<Utc>,
 pub updated_at: DateTime<Utc>,
}

impl Order {
 pub fn is_cancellable(&self) -> bool {
 !self.status.is_terminal()
 }
}
