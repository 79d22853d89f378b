use ferrotrade_exchange::model::MarketStreamEvent;
use ferrotrade_instrument::ExchangeId;
use ferrotrade_integration::channel::MailboxTx;
use ferrotrade_integration::Id;
use serde::{Deserialize, Serialize};

/// Default per-subscriber mailbox depth. Sustained overflow past this, tracked by
/// [`MailboxTx::overflow_count`], triggers eviction .
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1_024;

/// Consecutive-overflow threshold past which a subscriber is evicted rather than merely
/// dropping messages. Chosen generously: a handful of dropped ticks under a burst is normal,
/// sustained drops indicate a consumer that cannot keep up.
pub const EVICTION_THRESHOLD: u64 = 200;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SubscriptionKind {
 Ticker,
 Trades,
 Depth,
 Candle,
 MarkPrice,
 Funding,
}

/// The identity of one fan-out stream: subscribers registering the same key share the single
/// upstream C1 stream subscription behind it .
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
 pub kind: SubscriptionKind,
 pub venue: ExchangeId,
 pub symbol: String,
 pub interval: Option<String>,
}

impl SubscriptionKey {
 pub fn new(kind: SubscriptionKind, venue: ExchangeId, symbol: impl Into<String>, interval: Option<String>) -> Self {
 Self {
 kind,
 venue,
 symbol: symbol.into(),
 interval,
 }
 }

 /// The venue-native stream name this key maps to (Binance USDⓈ-M conventions).
 pub fn stream_name(&self) -> String {
 let symbol = self.symbol.to_lowercase();
 match self.kind {
 SubscriptionKind::Ticker => format!("{symbol}@ticker"),
 SubscriptionKind::Trades => format!("{symbol}@aggTrade"),
 SubscriptionKind::Depth => format!("{symbol}@depth20@100ms"),
 SubscriptionKind::Candle => {
 let interval = self.interval.as_deref().unwrap_or("1m");
 format!("{symbol}@kline_{interval}")
 }
 SubscriptionKind::MarkPrice | SubscriptionKind::Funding => format!("{symbol}@markPrice@1s"),
 }
 }
}

/// What a Market-Data Hub subscriber receives: either a translated event or a terminal notice
/// that this subscription was evicted for sustained slow consumption.
#[derive(Debug, Clone)]
pub enum HubEvent {
 Data(MarketStreamEvent),
 Evicted { reason: String },
}

pub(crate) struct Subscriber {
 pub id: Id,
 pub tx: MailboxTx<HubEvent>,
}
