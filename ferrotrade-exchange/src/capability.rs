use crate::error::ExchangeError;
use crate::model::{
 AccountSnapshot, CancelOrderRequest, MarginMode, OrderAck, PlaceOrderRequest, PositionSnapshot,
 SymbolInfo,
};
use async_trait::async_trait;
use ferrotrade_integration::channel::UnboundedRx;

/// The capability set every venue adapter implements . The Order Router, Market-Data
/// Hub and Control Plane talk to venues exclusively through this trait; adding a venue means
/// adding one more implementor, never touching a caller.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
 async fn get_account(&self) -> Result<AccountSnapshot, ExchangeError>;

 async fn get_positions(&self) -> Result<Vec<PositionSnapshot>, ExchangeError>;

 async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ExchangeError>;

 async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderAck, ExchangeError>;

 async fn cancel_order(&self, request: CancelOrderRequest) -> Result<OrderAck, ExchangeError>;

 async fn get_order( &self,
 symbol: &str,
 venue_order_id: &str,
) -> Result<OrderAck, ExchangeError>;

 async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderAck>, ExchangeError>;

 async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError>;

 async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> Result<(), ExchangeError>;

 /// Subscribes to the named market streams, returning a channel of translated
 /// [`crate::model::MarketStreamEvent`]s. One call may span multiple streams; the adapter
 /// multiplexes them over a single connection here stream client semantics.
 async fn subscribe_market_stream( &self,
 streams: Vec<String>,
) -> Result<UnboundedRx<crate::model::MarketStreamEvent>, ExchangeError>;

 async fn subscribe_user_stream( &self,
) -> Result<UnboundedRx<crate::model::UserStreamEvent>, ExchangeError>;
}
