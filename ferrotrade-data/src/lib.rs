//! The Market-Data Hub: maintains per-(venue, symbol) tickers, order books, trade
//! windows and candle windows, fed from C1 stream subscriptions and fanned out to subscribers
//! over bounded mailboxes with slow-consumer eviction.

pub mod error;
pub mod hub;
pub mod orderbook;
pub mod ring;
pub mod subscription;
pub mod symbol_state;

pub use error::DataError;
pub use hub::MarketDataHub;
pub use subscription::{HubEvent, SubscriptionKey, SubscriptionKind};
