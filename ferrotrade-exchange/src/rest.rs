use crate::error::ExchangeError;
use crate::model::{
 AccountSnapshot, ApiCredentials, AssetBalance, CancelOrderRequest, MarginMode, OrderAck,
 PlaceOrderRequest, PositionSide, PositionSnapshot, Side, SymbolInfo, VenueOrderStatus,
};
use chrono::Utc;
use ferrotrade_instrument::{AssetName, Environment, ExchangeId};
use ferrotrade_integration::rate_limit::{Backoff, Priority, RateLimiter};
use ferrotrade_integration::signing::{canonical_query, hmac_sha256_hex};
use rand::Rng;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 5;
const RECV_WINDOW_MS: u64 = 5_000;

/// REST client for Binance USDⓈ-M Futures: signs every private request, spends from a
/// shared per-venue token bucket, and retries transient faults with the shared [`Backoff`]
/// schedule before giving up.
pub struct BinanceUsdFuturesClient {
 http: reqwest::Client,
 base_url: String,
 credentials: ApiCredentials,
 rate_limiter: RateLimiter,
}

impl BinanceUsdFuturesClient {
 pub fn new(env: Environment, credentials: ApiCredentials, rate_limiter: RateLimiter) -> Self {
 Self {
 http: reqwest::Client::new(),
 base_url: ExchangeId::BinanceUsdFutures
 .default_rest_base_url(env)
 .to_string(),
 credentials,
 rate_limiter,
 }
 }

 /// Issues a signed (private) request against `path`, retrying transient failures up to
 /// [`MAX_ATTEMPTS`] with the shared backoff schedule .
 async fn signed_request( &self,
 method: Method,
 path: &str,
 params: &[(&str, String)],
 priority: Priority,
) -> Result<Value, ExchangeError> {
 let mut backoff = Backoff::default();
 let mut dispatched = false;

 for attempt in 1..=MAX_ATTEMPTS {
 self.rate_limiter.acquire(priority).await;

 let timestamp_ms = Utc::now().timestamp_millis();
 let query = canonical_query(params, timestamp_ms, RECV_WINDOW_MS);
 let signature = hmac_sha256_hex(&self.credentials.secret_key, &query);
 let url = format!("{}{path}?{query}&signature={signature}", self.base_url);

 let request = self
 .http
 .request(method.clone(), &url)
 .header("X-MBX-APIKEY", &self.credentials.api_key);

 dispatched = true;
 let response = match request.send().await {
 Ok(response) => response,
 Err(err) if attempt < MAX_ATTEMPTS && !dispatched_past_point_of_no_return(&err) => {
 warn!(path, attempt, error = %err, "transient network error, retrying");
 sleep_with_jitter(&mut backoff).await;
 continue;
 }
 Err(err) => {
 return Err(ExchangeError::ExchangeUnknown {
 endpoint: path.to_string(),
 detail: err.to_string(),
 });
 }
 };

 let status = response.status();
 if status.is_success() {
 self.rate_limiter.reset_backoff().await;
 return response
 .json::<Value>() .await
 .map_err(|err| ExchangeError::ExchangeUnknown {
 endpoint: path.to_string(),
 detail: format!("malformed response body: {err}"),
 });
 }

 let body: Value = response.json::<Value>().await.unwrap_or(Value::Null);
 let venue_code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
 let message = body
 .get("msg")
 .and_then(Value::as_str)
 .unwrap_or("unknown venue error")
 .to_string();

 if is_transient(status, venue_code) {
 self.rate_limiter.report_violation().await;
 if attempt < MAX_ATTEMPTS {
 debug!(path, attempt, venue_code, "transient venue error, retrying");
 sleep_with_jitter(&mut backoff).await;
 continue;
 }
 return Err(ExchangeError::ExchangeTransient {
 endpoint: path.to_string(),
 attempts: attempt,
 detail: message,
 });
 }

 return Err(ExchangeError::ExchangeRejected {
 endpoint: path.to_string(),
 venue_code,
 detail: message,
 });
 }

 unreachable!("loop always returns by MAX_ATTEMPTS")
 }

 async fn public_request(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ExchangeError> {
 self.rate_limiter.acquire(Priority::Low).await;
 let query = params
 .iter()
 .map(|(k, v)| format!("{k}={v}"))
 .collect::<Vec<_>>()
 .join("&");
 let url = if query.is_empty() {
 format!("{}{path}", self.base_url)
 } else {
 format!("{}{path}?{query}", self.base_url)
 };

 let response = self
 .http
 .get(&url)
 .send()
 .await
 .map_err(|err| ExchangeError::ExchangeTransient {
 endpoint: path.to_string(),
 attempts: 1,
 detail: err.to_string(),
 })?;

 response
 .json::<Value>() .await
 .map_err(|err| ExchangeError::ExchangeUnknown {
 endpoint: path.to_string(),
 detail: err.to_string(),
 })
 }

 pub async fn get_account(&self) -> Result<AccountSnapshot, ExchangeError> {
 let body = self
 .signed_request(Method::GET, "/fapi/v2/account", &[], Priority::Normal)
 .await?;

 let balances = body
 .get("assets")
 .and_then(Value::as_array)
 .cloned()
 .unwrap_or_default()
 .into_iter()
 .filter_map(|asset| {
 Some(AssetBalance {
 asset: AssetName::new(asset.get("asset")?.as_str()?.to_string()),
 wallet_balance: decimal_field(&asset, "walletBalance"),
 available_balance: decimal_field(&asset, "availableBalance"),
 })
 })
 .collect();

 Ok(AccountSnapshot {
 balances,
 fetched_at: Utc::now(),
 })
 }

 pub async fn get_positions(&self) -> Result<Vec<PositionSnapshot>, ExchangeError> {
 let body = self
 .signed_request(Method::GET, "/fapi/v2/positionRisk", &[], Priority::Normal)
 .await?;

 let positions = body
 .as_array()
 .cloned()
 .unwrap_or_default()
 .into_iter()
 .filter_map(|row| {
 let quantity = decimal_field(&row, "positionAmt");
 if quantity.is_zero() {
 return None;
 }
 Some(PositionSnapshot {
 symbol: row.get("symbol")?.as_str()?.to_string(),
 side: if quantity.is_sign_negative() {
 PositionSide::Short
 } else {
 PositionSide::Long
 },
 quantity: quantity.abs(),
 entry_price: decimal_field(&row, "entryPrice"),
 mark_price: decimal_field(&row, "markPrice"),
 unrealized_pnl: decimal_field(&row, "unRealizedProfit"),
 leverage: row
 .get("leverage")
 .and_then(Value::as_str)
 .and_then(|s| s.parse().ok())
 .unwrap_or(1),
 margin_mode: if row.get("marginType").and_then(Value::as_str) == Some("isolated") {
 MarginMode::Isolated
 } else {
 MarginMode::Cross
 },
 })
 })
 .collect();

 Ok(positions)
 }

 pub async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
 let body = self.public_request("/fapi/v1/exchangeInfo", &[]).await?;

 let symbols = body
 .get("symbols")
 .and_then(Value::as_array)
 .cloned()
 .unwrap_or_default()
 .into_iter()
 .filter_map(parse_symbol_info)
 .collect();

 Ok(symbols)
 }

 pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<OrderAck, ExchangeError> {
 let mut params = vec![
 ("symbol", request.symbol.clone()),
 ("side", side_str(request.side).to_string()),
 ("type", order_type_str(request.order_type).to_string()),
 ("quantity", request.quantity.to_string()),
 ("newClientOrderId", request.client_order_id.clone()),
 ];
 if let Some(price) = request.price {
 params.push(("price", price.to_string()));
 }
 if let Some(tif) = request.time_in_force {
 params.push(("timeInForce", tif_str(tif).to_string()));
 }
 if request.reduce_only {
 params.push(("reduceOnly", "true".to_string()));
 }

 let body = self
 .signed_request(Method::POST, "/fapi/v1/order", &params, Priority::High)
 .await?;
 parse_order_ack(&body)
 }

 pub async fn cancel_order(&self, request: CancelOrderRequest) -> Result<OrderAck, ExchangeError> {
 let mut params = vec![("symbol", request.symbol.clone())];
 if let Some(id) = &request.venue_order_id {
 params.push(("orderId", id.clone()));
 }
 if let Some(id) = &request.client_order_id {
 params.push(("origClientOrderId", id.clone()));
 }

 let body = self
 .signed_request(Method::DELETE, "/fapi/v1/order", &params, Priority::High)
 .await?;
 parse_order_ack(&body)
 }

 pub async fn get_order(&self, symbol: &str, venue_order_id: &str) -> Result<OrderAck, ExchangeError> {
 let params = vec![
 ("symbol", symbol.to_string()),
 ("orderId", venue_order_id.to_string()),
 ];
 let body = self
 .signed_request(Method::GET, "/fapi/v1/order", &params, Priority::Normal)
 .await?;
 parse_order_ack(&body)
 }

 pub async fn list_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderAck>, ExchangeError> {
 let params: Vec<(&str, String)> = symbol
 .map(|s| vec![("symbol", s.to_string())])
 .unwrap_or_default();
 let body = self
 .signed_request(Method::GET, "/fapi/v1/openOrders", &params, Priority::Normal)
 .await?;
 let orders = body
 .as_array()
 .cloned()
 .unwrap_or_default()
 .iter()
 .filter_map(|row| parse_order_ack(row).ok())
 .collect();
 Ok(orders)
 }

 pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), ExchangeError> {
 let params = vec![
 ("symbol", symbol.to_string()),
 ("leverage", leverage.to_string()),
 ];
 self.signed_request(Method::POST, "/fapi/v1/leverage", &params, Priority::Normal)
 .await?;
 Ok(())
 }

 pub async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> Result<(), ExchangeError> {
 let mode_str = match mode {
 MarginMode::Cross => "CROSSED",
 MarginMode::Isolated => "ISOLATED",
 };
 let params = vec![("symbol", symbol.to_string()), ("marginType", mode_str.to_string())];
 match self
 .signed_request(Method::POST, "/fapi/v1/marginType", &params, Priority::Normal)
 .await
 {
 // Binance rejects a no-op margin type change with code -4046; the desired state is
 // already in effect so this is not a failure from the caller's perspective.
 Err(ExchangeError::ExchangeRejected { venue_code, .. }) if venue_code == -4046 => Ok(()),
 other => other.map(|_| ()),
 }
 }

 /// Creates (or keeps alive, per the venue's listenKey TTL) the user data stream key used to
 /// subscribe to account/order events.
 pub async fn create_listen_key(&self) -> Result<String, ExchangeError> {
 let body = self
 .signed_request(Method::POST, "/fapi/v1/listenKey", &[], Priority::Normal)
 .await?;
 body.get("listenKey")
 .and_then(Value::as_str)
 .map(str::to_string)
 .ok_or_else(|| ExchangeError::ExchangeUnknown {
 endpoint: "/fapi/v1/listenKey".to_string(),
 detail: "response missing listenKey".to_string(),
 })
 }

 pub fn ws_base_url(&self, env: Environment) -> &'static str {
 ExchangeId::BinanceUsdFutures.default_ws_base_url(env)
 }
}

fn is_transient(status: StatusCode, venue_code: i64) -> bool {
 status.is_server_error() || venue_code == -1008 || status == StatusCode::TOO_MANY_REQUESTS
}

/// A reqwest error occurring after headers were sent cannot be safely retried on a SIGNED
/// endpoint: the request may already be live on the venue (`ExchangeUnknown`).
fn dispatched_past_point_of_no_return(err: &reqwest::Error) -> bool {
 err.is_body() || err.is_decode()
}

async fn sleep_with_jitter(backoff: &mut Backoff) {
 let jitter_unit = rand::rng().random_range(-1.0..=1.0);
 let delay: Duration = backoff.next_delay(jitter_unit);
 tokio::time::sleep(delay).await;
}

fn decimal_field(value: &Value, key: &str) -> Decimal {
 value
 .get(key)
 .and_then(Value::as_str)
 .and_then(|s| Decimal::from_str(s).ok())
 .unwrap_or(Decimal::ZERO)
}

fn side_str(side: Side) -> &'static str {
 match side {
 Side::Buy => "BUY",
 Side::Sell => "SELL",
 }
}

fn order_type_str(order_type: crate::model::OrderType) -> &'static str {
 match order_type {
 crate::model::OrderType::Market => "MARKET",
 crate::model::OrderType::Limit => "LIMIT",
 }
}

fn tif_str(tif: crate::model::TimeInForce) -> &'static str {
 match tif {
 crate::model::TimeInForce::GoodTilCanceled => "GTC",
 crate::model::TimeInForce::ImmediateOrCancel => "IOC",
 crate::model::TimeInForce::FillOrKill => "FOK",
 }
}

fn parse_venue_status(raw: &str) -> VenueOrderStatus {
 match raw {
 "NEW" => VenueOrderStatus::New,
 "PARTIALLY_FILLED" => VenueOrderStatus::PartiallyFilled,
 "FILLED" => VenueOrderStatus::Filled,
 "CANCELED" | "EXPIRED_IN_MATCH" => VenueOrderStatus::Canceled,
 "EXPIRED" => VenueOrderStatus::Expired,
 _ => VenueOrderStatus::Rejected,
 }
}

fn parse_order_ack(body: &Value) -> Result<OrderAck, ExchangeError> {
 let venue_order_id = body
 .get("orderId")
 .map(|v| v.to_string())
 .ok_or_else(|| ExchangeError::ExchangeUnknown {
 endpoint: "order".to_string(),
 detail: "response missing orderId".to_string(),
 })?;
 let client_order_id = body
 .get("clientOrderId")
 .and_then(Value::as_str)
 .unwrap_or_default()
 .to_string();
 let status = body
 .get("status")
 .and_then(Value::as_str)
 .map(parse_venue_status)
 .unwrap_or(VenueOrderStatus::New);

 Ok(OrderAck {
 venue_order_id,
 client_order_id,
 status,
 filled_quantity: decimal_field(body, "executedQty"),
 average_price: body
 .get("avgPrice")
 .and_then(Value::as_str)
 .and_then(|s| Decimal::from_str(s).ok())
 .filter(|price| !price.is_zero()),
 updated_at: Utc::now(),
 })
}

#[derive(Deserialize)]
struct BinanceFilter {
 #[serde(rename = "filterType")]
 filter_type: String,
 #[serde(rename = "tickSize")]
 tick_size: Option<String>,
 #[serde(rename = "stepSize")]
 step_size: Option<String>,
 #[serde(rename = "notional")]
 notional: Option<String>,
}

fn parse_symbol_info(row: Value) -> Option<SymbolInfo> {
 let symbol = row.get("symbol")?.as_str()?.to_string();
 let base_asset = AssetName::new(row.get("baseAsset")?.as_str()?.to_string());
 let quote_asset = AssetName::new(row.get("quoteAsset")?.as_str()?.to_string());
 let trading = row.get("status").and_then(Value::as_str) == Some("TRADING");
 let price_precision = row
 .get("pricePrecision")
 .and_then(Value::as_u64)
 .unwrap_or(2) as u32;
 let quantity_precision = row
 .get("quantityPrecision")
 .and_then(Value::as_u64)
 .unwrap_or(3) as u32;

 let filters: Vec<BinanceFilter> =
 serde_json::from_value(row.get("filters").cloned().unwrap_or(Value::Array(vec![])))
 .unwrap_or_default();

 let mut tick_size = Decimal::ZERO;
 let mut lot_size = Decimal::ZERO;
 let mut min_notional = Decimal::ZERO;
 for filter in filters {
 match filter.filter_type.as_str() {
 "PRICE_FILTER" => {
 tick_size = filter
 .tick_size
 .and_then(|s| Decimal::from_str(&s).ok())
 .unwrap_or(tick_size)
 }
 "LOT_SIZE" => {
 lot_size = filter
 .step_size
 .and_then(|s| Decimal::from_str(&s).ok())
 .unwrap_or(lot_size)
 }
 "MIN_NOTIONAL" => {
 min_notional = filter
 .notional
 .and_then(|s| Decimal::from_str(&s).ok())
 .unwrap_or(min_notional)
 }
 _ => {}
 }
 }

 Some(SymbolInfo {
 symbol,
 base_asset,
 quote_asset,
 tick_size,
 lot_size,
 min_notional,
 price_precision,
 quantity_precision,
 trading,
 })
}
