use crate::capability::ExchangeAdapter;
use crate::error::ExchangeError;
use crate::model::{
 AccountSnapshot, ApiCredentials, CancelOrderRequest, MarginMode, MarketStreamEvent, OrderAck,
 PlaceOrderRequest, PositionSnapshot, SymbolInfo, UserStreamEvent,
};
use crate::rest::BinanceUsdFuturesClient;
use crate::stream::{MarketStreamClient, UserStreamClient};
use async_trait::async_trait;
use ferrotrade_instrument::Environment;
use ferrotrade_integration::channel::UnboundedRx;
use ferrotrade_integration::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Duration;

/// Binance USDⓈ-M Futures carries a 2400-request/minute weighted budget on the default tier;
/// each REST call spends at least one unit against this shared bucket.
const REQUEST_WEIGHT_BUDGET: usize = 2400;
const REQUEST_WEIGHT_WINDOW: Duration = Duration::from_secs(60);

/// The sole venue implementor of [`ExchangeAdapter`] today. Wraps the REST client and both
/// stream clients behind the capability trait so the Order Router and Market-Data Hub never
/// depend on Binance specifics.
pub struct BinanceUsdFuturesAdapter {
 rest: Arc<BinanceUsdFuturesClient>,
 market_stream: MarketStreamClient,
 user_stream: UserStreamClient,
}

impl BinanceUsdFuturesAdapter {
 pub fn new(env: Environment, credentials: ApiCredentials) -> Self {
 let rate_limiter = RateLimiter::new(REQUEST_WEIGHT_BUDGET, REQUEST_WEIGHT_WINDOW);
 let rest = Arc::new(BinanceUsdFuturesClient::new(env, credentials, rate_limiter));
 let ws_base = rest.ws_base_url(env).to_string();
 Self {
 rest,
 market_stream: MarketStreamClient::new(ws_base.clone()),
 user_stream: UserStreamClient::new(ws_base),
 }
 }
}

#[async_trait]
impl ExchangeAdapter for BinanceUsdFuturesAdapter {
 async fn get_account(&self) -> Result<AccountSnapshot, ExchangeError> {
 self.rest.get_account().await
 }

 async fn get_positions(&self) -> Result<Vec<PositionSnapshot>, ExchangeError> {
 self.rest.get_positions().await
 }

 async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
 self.rest.get_symbols().await
 }

 async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderAck, ExchangeError> {
 self.rest.place_order(request).await
 }

 async fn cancel_order(&self, request: CancelOrderRequest) -> Result<OrderAck, ExchangeError> {
 self.rest.cancel_order(request).await
 }

 async fn get_order(&self, symbol: &str, venue_order_id: &str) -> Result<OrderAck, ExchangeError> {
 self.rest.get_order(symbol, venue_order_id).await
 }

 async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderAck>, ExchangeError> {
 self.rest.list_open_orders(symbol).await
 }

 async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError> {
 self.rest.set_leverage(symbol, leverage).await
 }

 async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> Result<(), ExchangeError> {
 self.rest.set_margin_mode(symbol, mode).await
 }

 async fn subscribe_market_stream(
 &self,
 streams: Vec<String>,
 ) -> Result<UnboundedRx<MarketStreamEvent>, ExchangeError> {
 self.market_stream.subscribe(streams).await
 }

 async fn subscribe_user_stream(&self) -> Result<UnboundedRx<UserStreamEvent>, ExchangeError> {
 let rest = Arc::clone(&self.rest);
 self.user_stream
 .subscribe(move || {
 let rest = Arc::clone(&rest);
 async move { rest.create_listen_key().await }
 })
 .await
 }
}
