//! Canonical types every venue adapter accepts and returns. Nothing in this module is
//! Binance-specific; [`crate::rest::BinanceUsdFuturesClient`] translates to/from these at its
//! boundary so the rest of the core never sees a venue wire shape.

use chrono::{DateTime, Utc};
use ferrotrade_instrument::AssetName;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
 Buy,
 Sell,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OrderType {
 Market,
 Limit,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
 GoodTilCanceled,
 ImmediateOrCancel,
 FillOrKill,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MarginMode {
 Cross,
 Isolated,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
 Long,
 Short,
}

/// Venue-reported lifecycle of one order. `New` through `Expired` mirror the Binance USDⓈ-M
/// `status` field; the Order Router (C6) maps these onto the broader `OrderStatus` it persists.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum VenueOrderStatus {
 New,
 PartiallyFilled,
 Filled,
 Canceled,
 Rejected,
 Expired,
}

/// A signed order request, already normalized against `Symbol` tick/lot sizes by the caller
/// (step 1) and carrying the idempotency key the venue will deduplicate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
 pub client_order_id: String,
 pub symbol: String,
 pub side: Side,
 pub order_type: OrderType,
 pub time_in_force: Option<TimeInForce>,
 pub quantity: Decimal,
 pub price: Option<Decimal>,
 pub reduce_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
 pub venue_order_id: String,
 pub client_order_id: String,
 pub status: VenueOrderStatus,
 pub filled_quantity: Decimal,
 pub average_price: Option<Decimal>,
 pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
 pub symbol: String,
 pub venue_order_id: Option<String>,
 pub client_order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBalance {
 pub asset: AssetName,
 pub wallet_balance: Decimal,
 pub available_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
 pub balances: Vec<AssetBalance>,
 pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
 pub symbol: String,
 pub side: PositionSide,
 pub quantity: Decimal,
 pub entry_price: Decimal,
 pub mark_price: Decimal,
 pub unrealized_pnl: Decimal,
 pub leverage: u32,
 pub margin_mode: MarginMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
 pub symbol: String,
 pub base_asset: AssetName,
 pub quote_asset: AssetName,
 pub tick_size: Decimal,
 pub lot_size: Decimal,
 pub min_notional: Decimal,
 pub price_precision: u32,
 pub quantity_precision: u32,
 pub trading: bool,
}

/// One venue-side credential pair. Decrypted only inside C1 at call time (/// `ExchangeConnection`); never logged, never `Debug`-derived over the secret field.
#[derive(Clone)]
pub struct ApiCredentials {
 pub api_key: String,
 pub secret_key: String,
}

impl std::fmt::Debug for ApiCredentials {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 f.debug_struct("ApiCredentials")
 .field("api_key", &self.api_key)
 .field("secret_key", &"<redacted>")
 .finish()
 }
}

/// Market data pushed by a venue stream, already translated to canonical shape (/// ingests these directly).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketStreamEvent {
 Ticker {
 symbol: String,
 best_bid: Decimal,
 best_ask: Decimal,
 last_price: Decimal,
 event_time: DateTime<Utc>,
 },
 Trade {
 symbol: String,
 price: Decimal,
 quantity: Decimal,
 side: Side,
 event_time: DateTime<Utc>,
 },
 DepthSnapshot {
 symbol: String,
 last_update_id: u64,
 bids: Vec<(Decimal, Decimal)>,
 asks: Vec<(Decimal, Decimal)>,
 },
 DepthDiff {
 symbol: String,
 first_update_id: u64,
 final_update_id: u64,
 bids: Vec<(Decimal, Decimal)>,
 asks: Vec<(Decimal, Decimal)>,
 },
 Candle {
 symbol: String,
 interval: String,
 open: Decimal,
 high: Decimal,
 low: Decimal,
 close: Decimal,
 volume: Decimal,
 close_time: DateTime<Utc>,
 is_final: bool,
 },
 MarkPrice {
 symbol: String,
 mark_price: Decimal,
 funding_rate: Decimal,
 next_funding_time: DateTime<Utc>,
 },
 /// The connection was re-established: consumers with sequence-sensitive state (order
 /// books) must discard it and wait for a fresh `DepthSnapshot`.
 StreamReset { reason: String },
}

/// User-data-stream events ("Status reconciliation"): the primary source of order
/// status for the Order Router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserStreamEvent {
 OrderUpdate {
 venue_order_id: String,
 client_order_id: String,
 status: VenueOrderStatus,
 filled_quantity: Decimal,
 fill_price: Option<Decimal>,
 fee: Option<Decimal>,
 fee_asset: Option<AssetName>,
 event_time: DateTime<Utc>,
 },
 AccountUpdate {
 balances: Vec<AssetBalance>,
 positions: Vec<PositionSnapshot>,
 event_time: DateTime<Utc>,
 },
 StreamReset {
 reason: String,
 },
}
