//! The Order Router: normalizes, risk-gates and submits new orders, tracks their
//! lifecycle through a table-driven state machine, and forwards fills to the Portfolio Store.

pub mod client_order_id;
pub mod error;
pub mod order;
pub mod repository;
pub mod router;
pub mod state_machine;

pub use client_order_id::generate_client_order_id;
pub use error::ExecutionError;
pub use order::Order;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use router::{
 InMemorySymbolRegistry, NewOrderRequest, NoopReconciliationQueue, OrderRouter,
 ReconciliationQueue, RiskGate, SymbolRegistry,
};
pub use state_machine::{next_status, InvalidTransition, OrderEvent, OrderStatus};
