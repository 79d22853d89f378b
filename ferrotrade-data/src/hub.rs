use crate::error::DataError;
use crate::subscription::{HubEvent, Subscriber, SubscriptionKey, SubscriptionKind, DEFAULT_MAILBOX_CAPACITY, EVICTION_THRESHOLD};
use crate::symbol_state::{CandleSnapshot, MarkPriceSnapshot, SymbolState, TickerSnapshot, TradeSnapshot};
use ferrotrade_exchange::model::MarketStreamEvent;
use ferrotrade_exchange::ExchangeAdapter;
use ferrotrade_instrument::ExchangeId;
use ferrotrade_integration::channel::{BoundedMailbox, MailboxTx};
use ferrotrade_integration::Id;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Per (venue, symbol) canonical market state plus a fan-out subscription graph, fed by a
/// single upstream stream per (venue, symbol, type) . Generic over the venue
/// adapter so a second venue is a second [`MarketDataHub`] instance, not a code change here.
pub struct MarketDataHub<A: ExchangeAdapter + 'static> {
 inner: Arc<Inner<A>>,
}

impl<A: ExchangeAdapter + 'static> Clone for MarketDataHub<A> {
 fn clone(&self) -> Self {
 Self {
 inner: Arc::clone(&self.inner),
 }
 }
}

struct Inner<A: ExchangeAdapter + 'static> {
 adapter: Arc<A>,
 venue: ExchangeId,
 symbols: Mutex<HashMap<String, SymbolState>>,
 subscribers: Mutex<HashMap<SubscriptionKey, Vec<Subscriber>>>,
}

impl<A: ExchangeAdapter + 'static> MarketDataHub<A> {
 pub fn new(venue: ExchangeId, adapter: Arc<A>) -> Self {
 Self {
 inner: Arc::new(Inner {
 adapter,
 venue,
 symbols: Mutex::new(HashMap::new()),
 subscribers: Mutex::new(HashMap::new()),
 }),
 }
 }

 /// The most recently observed reference price for `symbol`: last traded price if the
 /// ticker stream has reported one, falling back to mark price. Used by callers (the Order
 /// Router's request normalization, the Risk Engine's pre-trade projection) that need a
 /// price but have no price of their own, e.g. a market order.
 pub fn reference_price(&self, symbol: &str) -> Option<rust_decimal::Decimal> {
 let symbols = self.inner.symbols.lock();
 let state = symbols.get(symbol)?;
 state
 .ticker
 .as_ref()
 .map(|ticker| ticker.last_price)
 .or_else(|| state.mark_price.as_ref().map(|mark| mark.mark_price))
 }

 /// Registers a new subscriber for `key`, triggering an upstream C1 stream subscription if
 /// none is active for this key yet. Returns the subscriber's id and mailbox receiver.
 pub async fn subscribe( &self,
 kind: SubscriptionKind,
 symbol: impl Into<String>,
 interval: Option<String>,
) -> Result<(Id, tokio::sync::mpsc::Receiver<HubEvent>), DataError> {
 let key = SubscriptionKey::new(kind, self.inner.venue, symbol, interval);
 let mailbox = BoundedMailbox::<HubEvent>::new(DEFAULT_MAILBOX_CAPACITY);
 let id = Id::new();
 let tx = MailboxTx::new(mailbox.tx.clone());

 let is_first = {
 let mut subscribers = self.inner.subscribers.lock();
 let list = subscribers.entry(key.clone()).or_default();
 let was_empty = list.is_empty();
 list.push(Subscriber { id, tx });
 was_empty
 };

 if is_first {
 self.start_upstream(key).await?;
 }

 Ok((id, mailbox.rx))
 }

 /// Removes a subscriber; if it was the last one for `key`, the upstream stream is left to
 /// run idle (no consumers downstream) rather than torn down synchronously, matching the
 /// fire-and-forget posture of the ingest loop. A production deployment would additionally
 /// issue an unsubscribe to C1 here.
 pub fn unsubscribe(&self, key: &SubscriptionKey, id: Id) {
 let mut subscribers = self.inner.subscribers.lock();
 if let Some(list) = subscribers.get_mut(key) {
 list.retain(|subscriber| subscriber.id != id);
 }
 }

 async fn start_upstream(&self, key: SubscriptionKey) -> Result<(), DataError> {
 let stream_name = key.stream_name;
 info!(stream = %stream_name, "subscribing to upstream market stream");
 let rx = self
 .inner
 .adapter
 .subscribe_market_stream(vec![stream_name])
 .await?;
 let hub = self.clone();
 tokio::spawn(async move { hub.ingest(key, rx).await });
 Ok(())
 }

 async fn ingest( &self,
 key: SubscriptionKey,
 mut rx: ferrotrade_integration::channel::UnboundedRx<MarketStreamEvent>,
) {
 while let Some(event) = rx.next().await {
 self.handle_event(&key, event);
 }
 warn!(?key, "upstream market stream ended");
 }

 fn handle_event(&self, key: &SubscriptionKey, event: MarketStreamEvent) {
 let symbol = key.symbol.clone();
 match &event {
 MarketStreamEvent::Ticker {
 best_bid,
 best_ask,
 last_price,
 event_time,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 symbols.entry(symbol).or_default().ticker = Some(TickerSnapshot {
 best_bid: *best_bid,
 best_ask: *best_ask,
 last_price: *last_price,
 updated_at: *event_time,
 });
 }
 MarketStreamEvent::Trade {
 price,
 quantity,
 event_time,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 symbols.entry(symbol).or_default().push_trade(TradeSnapshot {
 price: *price,
 quantity: *quantity,
 event_time: *event_time,
 });
 }
 MarketStreamEvent::DepthSnapshot {
 last_update_id,
 bids,
 asks,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 symbols
 .entry(symbol)
 .or_default()
 .order_book
 .apply_snapshot(*last_update_id, bids.clone(), asks.clone());
 }
 MarketStreamEvent::DepthDiff {
 first_update_id,
 final_update_id,
 bids,
 asks,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 let state = symbols.entry(symbol).or_default();
 if !state.order_book.is_synced {
 // No REST depth-snapshot capability is exposed by the adapter ;
 // bootstrap directly from the first diff observed after (re)subscription.
 state
 .order_book
 .apply_snapshot(*final_update_id, bids.clone(), asks.clone());
 } else if !state
 .order_book
 .apply_diff(*first_update_id, *final_update_id, bids.clone(), asks.clone())
 {
 warn!(symbol = %key.symbol, "order book sequence gap, re-snapshotting");
 state.order_book.reset();
 }
 }
 MarketStreamEvent::Candle {
 interval,
 open,
 high,
 low,
 close,
 volume,
 close_time,
 is_final,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 symbols.entry(symbol).or_default().push_candle( interval,
 CandleSnapshot {
 open: *open,
 high: *high,
 low: *low,
 close: *close,
 volume: *volume,
 close_time: *close_time,
 is_final: *is_final,
 },
);
 }
 MarketStreamEvent::MarkPrice {
 mark_price,
 funding_rate,
 next_funding_time,
 ..
 } => {
 let mut symbols = self.inner.symbols.lock();
 symbols.entry(symbol).or_default().mark_price = Some(MarkPriceSnapshot {
 mark_price: *mark_price,
 funding_rate: *funding_rate,
 next_funding_time: *next_funding_time,
 });
 }
 MarketStreamEvent::StreamReset { .. } => {
 let mut symbols = self.inner.symbols.lock();
 if let Some(state) = symbols.get_mut(&key.symbol) {
 state.order_book.reset();
 }
 }
 }

 self.fan_out(key, HubEvent::Data(event));
 }

 fn fan_out(&self, key: &SubscriptionKey, event: HubEvent) {
 let mut subscribers = self.inner.subscribers.lock();
 let Some(list) = subscribers.get_mut(key) else {
 return;
 };

 list.retain_mut(|subscriber| {
 if subscriber.tx.try_send(event.clone()) {
 return true;
 }
 if subscriber.tx.overflow_count < EVICTION_THRESHOLD {
 return true;
 }
 warn!(subscriber_id = %subscriber.id, ?key, "evicting slow consumer");
 let _ = subscriber.tx.try_send(HubEvent::Evicted {
 reason: "slow-consumer".to_string(),
 });
 false
 });
 }
}
