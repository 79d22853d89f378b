//! The strategy surface: "strategy code sees a minimal surface: `onTick`,
//! `onOrderUpdate`, `onPositionUpdate`, and issues orders via the Order Router."

use chrono::{DateTime, Utc};
use ferrotrade_execution::{NewOrderRequest, Order};
use ferrotrade_integration::Id;
use ferrotrade_portfolio::Position;
use rust_decimal::Decimal;
use serde_json::Value;

/// A normalized market price observation for one of the bot's symbols. The event mailbox
/// carries richer venue shapes (`MarketStreamEvent`); the runtime reduces them to
/// this before handing them to strategy code, which only ever needs a last-traded price.
#[derive(Debug, Clone)]
pub struct MarketTick {
 pub symbol: String,
 pub price: Decimal,
 pub event_time: DateTime<Utc>,
}

/// The two kinds of tick the mailbox delivers to `on_tick` (event mailbox items (a)
/// and (d)): a market observation, or a scheduled timer firing at the bot's declared cadence.
#[derive(Debug, Clone)]
pub enum TickEvent {
 Market(MarketTick),
 Timer(DateTime<Utc>),
}

/// What a strategy wants to do in response to an event. The runtime is the only thing that
/// actually talks to the Order Router; strategies stay pure request/response.
#[derive(Debug, Clone)]
pub enum StrategyAction {
 PlaceOrder(NewOrderRequest),
 CancelOrder(Id),
}

/// Implemented by every built-in and custom strategy. `checkpoint`/`restore` back the
/// per-bot state persistence described in: the runtime serializes whatever
/// `checkpoint` returns to Cache after each tick, and calls `restore` once at startup with the
/// last persisted value, if any.
pub trait Strategy: Send {
 fn on_tick(&mut self, event: &TickEvent) -> Vec<StrategyAction>;
 fn on_order_update(&mut self, order: &Order) -> Vec<StrategyAction>;
 fn on_position_update(&mut self, position: &Position) -> Vec<StrategyAction>;

 fn checkpoint(&self) -> Value;
 fn restore(&mut self, state: Value);
}
