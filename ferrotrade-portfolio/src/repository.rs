use crate::balance::BalanceSheet;
use crate::position::{ClosedTrade, Position};
use ferrotrade_integration::Id;
use std::collections::HashMap;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct PositionKey {
 user: Id,
 symbol: String,
}

/// Storage seam for the Portfolio Store , mirroring the
/// `PositionHandler`/`CashHandler`/`EquityHandler` split the engine uses — one trait per concern
/// so a future persistent-store implementor (Redis, Postgres) only has to satisfy the slice it
/// actually backs.
pub trait PortfolioRepository: Send + Sync {
 fn get_position(&self, user: Id, symbol: &str) -> Option<Position>;

 fn set_position(&mut self, position: Position);

 fn remove_position(&mut self, user: Id, symbol: &str) -> Option<Position>;

 fn open_positions(&self, user: Id) -> Vec<Position>;

 fn record_closed_trade(&mut self, user: Id, symbol: &str, trade: ClosedTrade);

 fn closed_trades(&self, user: Id, symbol: &str) -> Vec<ClosedTrade>;

 fn balances(&self, user: Id) -> BalanceSheet;

 fn set_balances(&mut self, user: Id, sheet: BalanceSheet);
}

/// In-memory `PortfolioRepository`, the only implementor today. **No durability guarantees** —
/// a process restart loses everything; persistence is left for a future store-backed
/// implementation of this trait.
#[derive(Debug, Default)]
pub struct InMemoryPortfolioRepository {
 open_positions: HashMap<PositionKey, Position>,
 closed_trades: HashMap<PositionKey, Vec<ClosedTrade>>,
 balances: HashMap<Id, BalanceSheet>,
}

impl InMemoryPortfolioRepository {
 pub fn new() -> Self {
 Self::default()
 }
}

impl PortfolioRepository for InMemoryPortfolioRepository {
 fn get_position(&self, user: Id, symbol: &str) -> Option<Position> {
 self.open_positions
 .get(&PositionKey { user, symbol: symbol.to_string() })
 .cloned()
 }

 fn set_position(&mut self, position: Position) {
 let key = PositionKey { user: position.user, symbol: position.symbol.clone() };
 self.open_positions.insert(key, position);
 }

 fn remove_position(&mut self, user: Id, symbol: &str) -> Option<Position> {
 self.open_positions.remove(&PositionKey { user, symbol: symbol.to_string() })
 }

 fn open_positions(&self, user: Id) -> Vec<Position> {
 self.open_positions
 .values()
 .filter(|position| position.user == user)
 .cloned()
 .collect()
 }

 fn record_closed_trade(&mut self, user: Id, symbol: &str, trade: ClosedTrade) {
 self.closed_trades
 .entry(PositionKey { user, symbol: symbol.to_string() })
 .or_default()
 .push(trade);
 }

 fn closed_trades(&self, user: Id, symbol: &str) -> Vec<ClosedTrade> {
 self.closed_trades
 .get(&PositionKey { user, symbol: symbol.to_string() })
 .cloned()
 .unwrap_or_default()
 }

 fn balances(&self, user: Id) -> BalanceSheet {
 self.balances.get(&user).cloned().unwrap_or_default()
 }

 fn set_balances(&mut self, user: Id, sheet: BalanceSheet) {
 self.balances.insert(user, sheet);
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::position::{Fill, Side};
 use ferrotrade_instrument::{AssetName, ExchangeId};
 use rust_decimal::Decimal;
 use rust_decimal_macros::dec;

 #[test]
 fn set_then_get_open_position_round_trips() {
 let mut repository = InMemoryPortfolioRepository::new();
 let user = Id::new();
 let fill = Fill {
 side: Side::Buy,
 price: dec!(50000),
 quantity: dec!(1),
 fee: Decimal::ZERO,
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: 1,
 venue_timestamp: chrono::Utc::now(),
 };
 let position = Position::open(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill).unwrap();
 repository.set_position(position.clone());

 let fetched = repository.get_position(user, "BTCUSDT").unwrap();
 assert_eq!(fetched.symbol, "BTCUSDT");
 assert_eq!(fetched.quantity, position.quantity);
 }

 #[test]
 fn removing_a_position_drops_it_from_open_positions() {
 let mut repository = InMemoryPortfolioRepository::new();
 let user = Id::new();
 let fill = Fill {
 side: Side::Buy,
 price: dec!(50000),
 quantity: dec!(1),
 fee: Decimal::ZERO,
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: 1,
 venue_timestamp: chrono::Utc::now(),
 };
 let position = Position::open(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &fill).unwrap();
 repository.set_position(position);
 assert!(repository.remove_position(user, "BTCUSDT").is_some());
 assert!(repository.get_position(user, "BTCUSDT").is_none());
 }
}
