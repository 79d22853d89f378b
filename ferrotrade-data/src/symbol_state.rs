use crate::orderbook::OrderBook;
use crate::ring::RollingWindow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

const TRADE_WINDOW: usize = 1_000;
const CANDLE_WINDOW: usize = 1_000;

#[derive(Debug, Clone)]
pub struct TickerSnapshot {
 pub best_bid: Decimal,
 pub best_ask: Decimal,
 pub last_price: Decimal,
 pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TradeSnapshot {
 pub price: Decimal,
 pub quantity: Decimal,
 pub event_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CandleSnapshot {
 pub open: Decimal,
 pub high: Decimal,
 pub low: Decimal,
 pub close: Decimal,
 pub volume: Decimal,
 pub close_time: DateTime<Utc>,
 pub is_final: bool,
}

#[derive(Debug, Clone)]
pub struct MarkPriceSnapshot {
 pub mark_price: Decimal,
 pub funding_rate: Decimal,
 pub next_funding_time: DateTime<Utc>,
}

/// Everything the hub remembers for one (venue, symbol): the latest ticker and mark price, a
/// canonical local order book, and bounded windows of recent trades/candles .
#[derive(Default)]
pub struct SymbolState {
 pub order_book: OrderBook,
 pub ticker: Option<TickerSnapshot>,
 pub mark_price: Option<MarkPriceSnapshot>,
 pub trades: Option<RollingWindow<TradeSnapshot>>,
 pub candles: HashMap<String, RollingWindow<CandleSnapshot>>,
}

impl SymbolState {
 pub fn push_trade(&mut self, trade: TradeSnapshot) {
 self.trades
 .get_or_insert_with(|| RollingWindow::new(TRADE_WINDOW))
 .push(trade);
 }

 pub fn push_candle(&mut self, interval: &str, candle: CandleSnapshot) {
 self.candles
 .entry(interval.to_string())
 .or_insert_with(|| RollingWindow::new(CANDLE_WINDOW))
 .push(candle);
 }
}
