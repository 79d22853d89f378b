use crate::balance::AssetBalance as SheetBalance;
use crate::balance::BalanceSheet;
use crate::error::PortfolioError;
use crate::position::{ClosedTrade, Fill, Position, PositionSide};
use crate::repository::PortfolioRepository;
use ferrotrade_exchange::model::{AccountSnapshot, PositionSide as VenuePositionSide, PositionSnapshot};
use ferrotrade_instrument::{AssetName, ExchangeId};
use ferrotrade_integration::Id;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Default reconciliation tolerance: a drift below this fraction of venue notional
/// is logged but not escalated.
pub const DEFAULT_RECONCILIATION_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4); // 0.0001 = 0.01%

/// A discrepancy between the store's view of a position and the venue's, found during
/// `sync_from_exchange`.
#[derive(Debug, Clone)]
pub struct ReconciliationDiscrepancy {
 pub symbol: String,
 pub store_notional: Decimal,
 pub venue_notional: Decimal,
 pub drift_fraction: Decimal,
 pub critical: bool,
}

/// Result of applying a fill: the (possibly updated) position plus a realized-trade event when
/// the fill reduced or flipped it.
#[derive(Debug, Clone)]
pub struct ApplyFillOutcome {
 pub position: Position,
 pub closed_trade: Option<ClosedTrade>,
}

/// Orchestrates the Portfolio Store on top of a [`PortfolioRepository`]: applies
/// fills, re-marks positions, and reconciles the stored view against an authoritative venue
/// snapshot. One instance is shared across the process; per-user positions are guarded
/// individually rather than behind one global lock so unrelated users never contend.
pub struct PortfolioStore<R: PortfolioRepository> {
 repository: Mutex<R>,
 tolerance: Decimal,
}

impl<R: PortfolioRepository> PortfolioStore<R> {
 pub fn new(repository: R) -> Self {
 Self {
 repository: Mutex::new(repository),
 tolerance: DEFAULT_RECONCILIATION_TOLERANCE,
 }
 }

 pub fn with_tolerance(repository: R, tolerance: Decimal) -> Self {
 Self {
 repository: Mutex::new(repository),
 tolerance,
 }
 }

 /// Applies one execution report to the named user/symbol position (`applyFill`),
 /// opening the position if none exists yet, and debits the fee / realized P&L against the
 /// user's margin-asset balance.
 pub fn apply_fill( &self,
 user: Id,
 venue: ExchangeId,
 symbol: &str,
 margin_asset: &AssetName,
 fill: Fill,
) -> Result<ApplyFillOutcome, PortfolioError> {
 let mut repository = self.repository.lock();

 let mut position = match repository.get_position(user, symbol) {
 Some(position) => position,
 None => Position::open(user, venue, symbol, &fill)?,
 };

 let closed_trade = if position.is_flat() {
 None
 } else {
 position.apply_fill(&fill)?
 };

 let mut sheet = repository.balances(user);
 sheet.debit_fee(margin_asset, fill.fee);
 if let Some(trade) = &closed_trade {
 sheet.apply_realized_pnl(margin_asset, trade.realized_pnl);
 repository.record_closed_trade(user, symbol, trade.clone());
 }
 repository.set_balances(user, sheet);

 if position.is_flat() {
 repository.remove_position(user, symbol);
 } else {
 repository.set_position(position.clone());
 }

 info!( %user, venue = %venue, symbol, side = ?position.side, quantity = %position.quantity,
 "applied fill"
);

 Ok(ApplyFillOutcome { position, closed_trade })
 }

 /// Recomputes unrealized P&L for every open position on `symbol` across all users carrying
 /// one (`updateMarkPrice`). Liquidation proximity against this mark is the Risk
 /// Engine's concern, not this store's.
 pub fn update_mark_price(&self, users: &[Id], symbol: &str, price: Decimal) {
 let mut repository = self.repository.lock();
 for &user in users {
 if let Some(mut position) = repository.get_position(user, symbol) {
 position.update_mark_price(price);
 repository.set_position(position);
 }
 }
 }

 pub fn open_positions(&self, user: Id) -> Vec<Position> {
 self.repository.lock().open_positions(user)
 }

 pub fn balances(&self, user: Id) -> BalanceSheet {
 self.repository.lock().balances(user)
 }

 /// Replaces the stored view of `user`'s positions and balances with an authoritative venue
 /// snapshot (`syncFromExchange`), logging any per-symbol notional discrepancy
 /// beyond `tolerance`. Returns every discrepancy observed, `critical` ones warranting a
 /// Risk Engine alert from the caller.
 pub fn sync_from_exchange(
 &self,
 user: Id,
 venue: ExchangeId,
 account: &AccountSnapshot,
 positions: &[PositionSnapshot],
) -> Vec<ReconciliationDiscrepancy> {
 let mut repository = self.repository.lock();

 let mut sheet = BalanceSheet::new();
 for balance in &account.balances {
 sheet.set( balance.asset.clone(),
 SheetBalance {
 wallet: balance.wallet_balance,
 available: balance.available_balance,
 },
);
 }

 let mut discrepancies = Vec::new();
 let mut seen_symbols = Vec::with_capacity(positions.len());

 for snapshot in positions {
 seen_symbols.push(snapshot.symbol.clone());
 let venue_notional = snapshot.quantity * snapshot.mark_price;
 let store_notional = repository
 .get_position(user, &snapshot.symbol)
 .map(|position| position.notional)
 .unwrap_or(Decimal::ZERO);

 let drift_fraction = if venue_notional.is_zero() {
 if store_notional.is_zero() { Decimal::ZERO } else { Decimal::ONE }
 } else {
 ((store_notional - venue_notional) / venue_notional).abs()
 };

 if drift_fraction > self.tolerance {
 let critical = drift_fraction > self.tolerance * Decimal::from(10);
 warn!( %user, symbol = %snapshot.symbol, %store_notional, %venue_notional,
 drift = %drift_fraction, critical, "portfolio reconciliation drift exceeded tolerance"
);
 discrepancies.push(ReconciliationDiscrepancy {
 symbol: snapshot.symbol.clone(),
 store_notional,
 venue_notional,
 drift_fraction,
 critical,
 });
 }

 let side = match snapshot.side {
 VenuePositionSide::Long => PositionSide::Long,
 VenuePositionSide::Short => PositionSide::Short,
 };
 let realized_pnl = repository
 .get_position(user, &snapshot.symbol)
 .map(|position| position.realized_pnl)
 .unwrap_or(Decimal::ZERO);
 repository.set_position(Position::from_snapshot( user,
 venue,
 snapshot.symbol.clone(),
 side,
 snapshot.quantity,
 snapshot.entry_price,
 snapshot.mark_price,
 snapshot.unrealized_pnl,
 realized_pnl,
));
 }

 for stale in repository.open_positions(user) {
 if !seen_symbols.contains(&stale.symbol) {
 repository.remove_position(user, &stale.symbol);
 }
 }

 repository.set_balances(user, sheet);
 discrepancies
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::position::Side;
 use crate::repository::InMemoryPortfolioRepository;
 use rust_decimal_macros::dec;

 fn fill(side: Side, price: Decimal, quantity: Decimal, trade_id: u64) -> Fill {
 Fill {
 side,
 price,
 quantity,
 fee: dec!(0.5),
 fee_asset: AssetName::new("USDT"),
 venue_trade_id: trade_id,
 venue_timestamp: chrono::Utc::now(),
 }
 }

 #[test]
 fn apply_fill_opens_a_position_and_debits_the_fee() {
 let store = PortfolioStore::new(InMemoryPortfolioRepository::new());
 let user = Id::new();
 let usdt = AssetName::new("USDT");

 let outcome = store
 .apply_fill(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &usdt, fill(Side::Buy, dec!(50000), dec!(1), 1))
 .unwrap();

 assert!(outcome.closed_trade.is_none());
 assert_eq!(outcome.position.quantity, dec!(1));
 assert_eq!(store.balances(user).get(&usdt).wallet, dec!(-0.5));
 }

 #[test]
 fn apply_fill_closing_a_position_credits_realized_pnl() {
 let store = PortfolioStore::new(InMemoryPortfolioRepository::new());
 let user = Id::new();
 let usdt = AssetName::new("USDT");

 store
 .apply_fill(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &usdt, fill(Side::Buy, dec!(50000), dec!(1), 1))
 .unwrap();
 let outcome = store
 .apply_fill(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &usdt, fill(Side::Sell, dec!(51000), dec!(1), 2))
 .unwrap();

 let trade = outcome.closed_trade.expect("fully closing the position realizes pnl");
 assert_eq!(trade.realized_pnl, dec!(999.5));
 assert!(outcome.position.is_flat());
 assert!(store.open_positions(user).is_empty());
 }

 #[test]
 fn update_mark_price_rewrites_unrealized_pnl_for_open_positions() {
 let store = PortfolioStore::new(InMemoryPortfolioRepository::new());
 let user = Id::new();
 let usdt = AssetName::new("USDT");
 store
 .apply_fill(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &usdt, fill(Side::Buy, dec!(50000), dec!(1), 1))
 .unwrap();

 store.update_mark_price(&[user], "BTCUSDT", dec!(52000));

 let position = store.open_positions(user).into_iter().next().unwrap();
 assert_eq!(position.unrealized_pnl, dec!(2000));
 }

 #[test]
 fn sync_from_exchange_replaces_positions_and_reports_drift() {
 let store = PortfolioStore::new(InMemoryPortfolioRepository::new());
 let user = Id::new();
 let usdt = AssetName::new("USDT");
 store
 .apply_fill(user, ExchangeId::BinanceUsdFutures, "BTCUSDT", &usdt, fill(Side::Buy, dec!(50000), dec!(2), 1))
 .unwrap();

 let account = AccountSnapshot {
 balances: vec![],
 fetched_at: chrono::Utc::now(),
 };
 let venue_positions = vec![PositionSnapshot {
 symbol: "BTCUSDT".to_string(),
 side: VenuePositionSide::Long,
 quantity: dec!(1),
 entry_price: dec!(50000),
 mark_price: dec!(50000),
 unrealized_pnl: dec!(0),
 leverage: 10,
 margin_mode: ferrotrade_exchange::model::MarginMode::Cross,
 }];

 let discrepancies = store.sync_from_exchange(user, ExchangeId::BinanceUsdFutures, &account, &venue_positions);
 assert_eq!(discrepancies.len(), 1, "store had 2 BTCUSDT but venue reports 1");
 assert!(discrepancies[0].critical);

 let position = store.open_positions(user).into_iter().next().unwrap();
 assert_eq!(position.quantity, dec!(1), "sync_from_exchange must overwrite the stored quantity");
 }
}
