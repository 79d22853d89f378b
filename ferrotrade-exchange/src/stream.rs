use crate::error::ExchangeError;
use crate::model::{MarketStreamEvent, Side, UserStreamEvent, VenueOrderStatus};
use chrono::{TimeZone, Utc};
use ferrotrade_integration::channel::{mpsc_unbounded, UnboundedRx, UnboundedTx};
use ferrotrade_integration::rate_limit::Backoff;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Half the venue's documented ping interval (Binance requires a pong within 10 minutes of its
/// ping; pinging at half that keeps the connection comfortably alive, here).
const PING_INTERVAL: Duration = Duration::from_secs(150);

/// Maintains one persistent connection to a combined-stream endpoint, re-subscribing on every
/// reconnect and emitting a reset event so sequence-sensitive consumers (order books) know to
/// re-snapshot.
pub struct MarketStreamClient {
 ws_base_url: String,
}

impl MarketStreamClient {
 pub fn new(ws_base_url: impl Into<String>) -> Self {
 Self {
 ws_base_url: ws_base_url.into(),
 }
 }

 /// Subscribes to `streams` (venue-native stream names, e.g. `btcusdt@aggTrade`) and spawns a
 /// background task that owns the connection for the lifetime of the returned receiver.
 pub async fn subscribe( &self,
 streams: Vec<String>,
) -> Result<UnboundedRx<MarketStreamEvent>, ExchangeError> {
 let (tx, rx) = mpsc_unbounded();
 let url = format!("{}/stream?streams={}", self.ws_base_url, streams.join("/"));
 tokio::spawn(run_market_stream(url, streams, tx));
 Ok(rx)
 }
}

async fn run_market_stream(url: String, streams: Vec<String>, tx: UnboundedTx<MarketStreamEvent>) {
 let mut backoff = Backoff::default();
 let mut first_connection = true;

 loop {
 let socket = match connect_async(&url).await {
 Ok((socket, _)) => socket,
 Err(err) => {
 warn!(error = %err, "market stream connect failed, backing off");
 tokio::time::sleep(backoff.next_delay(jitter())).await;
 continue;
 }
 };

 backoff.reset();
 if !first_connection {
 info!(streams = ?streams, "market stream reconnected, emitting stream-reset");
 if tx
 .send(MarketStreamEvent::StreamReset {
 reason: "reconnect".to_string(),
 })
 .is_err()
 {
 return;
 }
 }
 first_connection = false;

 if pump_market_socket(socket, &tx).await.is_break {
 return;
 }
 warn!(streams = ?streams, "market stream disconnected, reconnecting");
 }
}

enum Flow {
 Break,
 Continue,
}

impl Flow {
 fn is_break(&self) -> bool {
 matches!(self, Flow::Break)
 }
}

async fn pump_market_socket(mut socket: WsStream, tx: &UnboundedTx<MarketStreamEvent>) -> Flow {
 let mut ping_tick = tokio::time::interval(PING_INTERVAL);
 ping_tick.tick().await; // first tick fires immediately

 loop {
 tokio::select! {
 _ = ping_tick.tick() => {
 if socket.send(Message::Ping(Vec::new())).await.is_err() {
 return Flow::Continue;
 }
 }
 frame = socket.next() => {
 match frame {
 Some(Ok(Message::Text(text))) => {
 if let Some(event) = parse_market_event(&text) {
 if tx.send(event).is_err() {
 return Flow::Break;
 }
 }
 }
 Some(Ok(Message::Ping(payload))) => {
 let _ = socket.send(Message::Pong(payload)).await;
 }
 Some(Ok(Message::Close(_))) | None => return Flow::Continue,
 Some(Err(err)) => {
 warn!(error = %err, "market stream read error");
 return Flow::Continue;
 }
 _ => {}
 }
 }
 }
 }
}

fn jitter() -> f64 {
 rand::random::<f64>() * 2.0 - 1.0
}

fn parse_market_event(text: &str) -> Option<MarketStreamEvent> {
 let envelope: Value = serde_json::from_str(text).ok()?;
 let stream = envelope.get("stream")?.as_str()?;
 let data = envelope.get("data")?;
 let symbol = data.get("s")?.as_str()?.to_uppercase();

 if stream.ends_with("@aggTrade") {
 Some(MarketStreamEvent::Trade {
 symbol,
 price: decimal(data, "p"),
 quantity: decimal(data, "q"),
 side: if data.get("m").and_then(Value::as_bool).unwrap_or(false) {
 Side::Sell
 } else {
 Side::Buy
 },
 event_time: millis(data.get("E")),
 })
 } else if stream.contains("@depth") {
 Some(MarketStreamEvent::DepthDiff {
 symbol,
 first_update_id: data.get("U").and_then(Value::as_u64).unwrap_or(0),
 final_update_id: data.get("u").and_then(Value::as_u64).unwrap_or(0),
 bids: levels(data.get("b")),
 asks: levels(data.get("a")),
 })
 } else if stream.ends_with("@markPrice@1s") {
 Some(MarketStreamEvent::MarkPrice {
 symbol,
 mark_price: decimal(data, "p"),
 funding_rate: decimal(data, "r"),
 next_funding_time: millis(data.get("T")),
 })
 } else if stream.ends_with("@ticker") {
 Some(MarketStreamEvent::Ticker {
 symbol,
 best_bid: decimal(data, "b"),
 best_ask: decimal(data, "a"),
 last_price: decimal(data, "c"),
 event_time: millis(data.get("E")),
 })
 } else if stream.contains("@kline") {
 let k = data.get("k")?;
 Some(MarketStreamEvent::Candle {
 symbol,
 interval: k.get("i")?.as_str()?.to_string(),
 open: decimal(k, "o"),
 high: decimal(k, "h"),
 low: decimal(k, "l"),
 close: decimal(k, "c"),
 volume: decimal(k, "v"),
 close_time: millis(k.get("T")),
 is_final: k.get("x").and_then(Value::as_bool).unwrap_or(false),
 })
 } else {
 None
 }
}

fn decimal(value: &Value, key: &str) -> Decimal {
 value
 .get(key)
 .and_then(Value::as_str)
 .and_then(|s| Decimal::from_str(s).ok())
 .unwrap_or(Decimal::ZERO)
}

fn millis(value: Option<&Value>) -> chrono::DateTime<Utc> {
 value
 .and_then(Value::as_i64)
 .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
 .unwrap_or_else(Utc::now)
}

fn levels(value: Option<&Value>) -> Vec<(Decimal, Decimal)> {
 value
 .and_then(Value::as_array)
 .map(|rows| {
 rows.iter()
 .filter_map(|row| {
 let pair = row.as_array()?;
 let price = Decimal::from_str(pair.first()?.as_str()?).ok()?;
 let quantity = Decimal::from_str(pair.get(1)?.as_str()?).ok()?;
 Some((price, quantity))
 })
 .collect()
 })
 .unwrap_or_default()
}

/// Maintains the user data stream: obtains a listenKey, connects, and keeps the key alive.
/// Re-subscription after reconnect means re-fetching a fresh listenKey, since the old one is
/// invalidated by the disconnect.
pub struct UserStreamClient {
 ws_base_url: String,
}

impl UserStreamClient {
 pub fn new(ws_base_url: impl Into<String>) -> Self {
 Self {
 ws_base_url: ws_base_url.into(),
 }
 }

 /// `fetch_listen_key` is called once up front and again after every reconnect, since a
 /// dropped connection invalidates the previous key.
 pub async fn subscribe<F, Fut>( &self,
 fetch_listen_key: F,
) -> Result<UnboundedRx<UserStreamEvent>, ExchangeError>
 where
 F: Fn() -> Fut + Send + Sync + 'static,
 Fut: std::future::Future<Output = Result<String, ExchangeError>> + Send,
 {
 let (tx, rx) = mpsc_unbounded();
 let ws_base_url = self.ws_base_url.clone();
 tokio::spawn(run_user_stream(ws_base_url, fetch_listen_key, tx));
 Ok(rx)
 }
}

async fn run_user_stream<F, Fut>(ws_base_url: String, fetch_listen_key: F, tx: UnboundedTx<UserStreamEvent>)
where
 F: Fn() -> Fut,
 Fut: std::future::Future<Output = Result<String, ExchangeError>>,
{
 let mut backoff = Backoff::default();
 let mut first_connection = true;

 loop {
 let listen_key = match fetch_listen_key().await {
 Ok(key) => key,
 Err(err) => {
 warn!(error = %err, "failed to obtain listenKey, backing off");
 tokio::time::sleep(backoff.next_delay(jitter())).await;
 continue;
 }
 };

 let url = format!("{ws_base_url}/ws/{listen_key}");
 let socket = match connect_async(&url).await {
 Ok((socket, _)) => socket,
 Err(err) => {
 warn!(error = %err, "user stream connect failed, backing off");
 tokio::time::sleep(backoff.next_delay(jitter())).await;
 continue;
 }
 };

 backoff.reset();
 if !first_connection {
 info!("user stream reconnected, emitting stream-reset");
 if tx
 .send(UserStreamEvent::StreamReset {
 reason: "reconnect".to_string(),
 })
 .is_err()
 {
 return;
 }
 }
 first_connection = false;

 if pump_user_socket(socket, &tx).await.is_break {
 return;
 }
 warn!("user stream disconnected, reconnecting");
 }
}

async fn pump_user_socket(mut socket: WsStream, tx: &UnboundedTx<UserStreamEvent>) -> Flow {
 let mut ping_tick = tokio::time::interval(PING_INTERVAL);
 ping_tick.tick().await;

 loop {
 tokio::select! {
 _ = ping_tick.tick() => {
 if socket.send(Message::Ping(Vec::new())).await.is_err() {
 return Flow::Continue;
 }
 }
 frame = socket.next() => {
 match frame {
 Some(Ok(Message::Text(text))) => {
 if let Some(event) = parse_user_event(&text) {
 if tx.send(event).is_err() {
 return Flow::Break;
 }
 }
 }
 Some(Ok(Message::Ping(payload))) => {
 let _ = socket.send(Message::Pong(payload)).await;
 }
 Some(Ok(Message::Close(_))) | None => return Flow::Continue,
 Some(Err(err)) => {
 warn!(error = %err, "user stream read error");
 return Flow::Continue;
 }
 _ => {}
 }
 }
 }
 }
}

fn parse_user_event(text: &str) -> Option<UserStreamEvent> {
 let envelope: Value = serde_json::from_str(text).ok()?;
 match envelope.get("e")?.as_str()? {
 "ORDER_TRADE_UPDATE" => {
 let order = envelope.get("o")?;
 Some(UserStreamEvent::OrderUpdate {
 venue_order_id: order.get("i")?.to_string(),
 client_order_id: order.get("c")?.as_str()?.to_string(),
 status: parse_status(order.get("X")?.as_str()?),
 filled_quantity: decimal(order, "z"),
 fill_price: Some(decimal(order, "L")).filter(|p| !p.is_zero()),
 fee: Some(decimal(order, "n")).filter(|f| !f.is_zero()),
 fee_asset: order
 .get("N")
 .and_then(Value::as_str)
 .map(|s| ferrotrade_instrument::AssetName::new(s.to_string())),
 event_time: millis(envelope.get("E")),
 })
 }
 "ACCOUNT_UPDATE" => {
 // Balance/position deltas are handled by the caller re-fetching a full snapshot;
 // the event here only signals that one occurred.
 Some(UserStreamEvent::AccountUpdate {
 balances: Vec::new(),
 positions: Vec::new(),
 event_time: millis(envelope.get("E")),
 })
 }
 _ => None,
 }
}

fn parse_status(raw: &str) -> VenueOrderStatus {
 match raw {
 "NEW" => VenueOrderStatus::New,
 "PARTIALLY_FILLED" => VenueOrderStatus::PartiallyFilled,
 "FILLED" => VenueOrderStatus::Filled,
 "CANCELED" | "EXPIRED_IN_MATCH" => VenueOrderStatus::Canceled,
 "EXPIRED" => VenueOrderStatus::Expired,
 _ => VenueOrderStatus::Rejected,
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn parses_agg_trade_stream() {
 let text = r#"{"stream":"btcusdt@aggTrade","data":{"s":"BTCUSDT","p":"50000.10","q":"0.010","m":false,"E":1700000000000}}"#;
 let event = parse_market_event(text).expect("should parse");
 match event {
 MarketStreamEvent::Trade { symbol, side, .. } => {
 assert_eq!(symbol, "BTCUSDT");
 assert_eq!(side, Side::Buy);
 }
 other => panic!("unexpected event: {other:?}"),
 }
 }

 #[test]
 fn parses_order_trade_update() {
 let text = r#"{"e":"ORDER_TRADE_UPDATE","E":1700000000000,"o":{"i":1,"c":"abc","X":"FILLED","z":"1.000","L":"50000.00","n":"0.01","N":"USDT"}}"#;
 let event = parse_user_event(text).expect("should parse");
 match event {
 UserStreamEvent::OrderUpdate { status, client_order_id, .. } => {
 assert_eq!(status, VenueOrderStatus::Filled);
 assert_eq!(client_order_id, "abc");
 }
 other => panic!("unexpected event: {other:?}"),
 }
 }
}
