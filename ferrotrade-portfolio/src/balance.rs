use ferrotrade_instrument::AssetName;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single asset's wallet vs. available balance . `available` trails `wallet` by
/// whatever is locked in open orders or isolated-margin positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssetBalance {
 pub wallet: Decimal,
 pub available: Decimal,
}

impl AssetBalance {
 pub fn zero() -> Self {
 Self {
 wallet: Decimal::ZERO,
 available: Decimal::ZERO,
 }
 }

 pub fn locked(&self) -> Decimal {
 self.wallet - self.available
 }
}

/// Per-user, per-asset balance ledger. Fees are debited from `wallet` and `available` alike
/// since a paid fee is gone, not merely reserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
 balances: HashMap<AssetName, AssetBalance>,
}

impl BalanceSheet {
 pub fn new() -> Self {
 Self::default()
 }

 pub fn get(&self, asset: &AssetName) -> AssetBalance {
 self.balances.get(asset).copied().unwrap_or_else(AssetBalance::zero)
 }

 pub fn set(&mut self, asset: AssetName, balance: AssetBalance) {
 self.balances.insert(asset, balance);
 }

 pub fn iter(&self) -> impl Iterator<Item = (&AssetName, &AssetBalance)> {
 self.balances.iter()
 }

 /// Debits a realized fee from both wallet and available balance of `asset`.
 pub fn debit_fee(&mut self, asset: &AssetName, fee: Decimal) {
 if fee.is_zero() {
 return;
 }
 let entry = self.balances.entry(asset.clone()).or_insert_with(AssetBalance::zero);
 entry.wallet -= fee;
 entry.available -= fee;
 }

 /// Applies realized P&L (denominated in `asset`, the margin asset) to wallet and available
 /// balance alike.
 pub fn apply_realized_pnl(&mut self, asset: &AssetName, pnl: Decimal) {
 if pnl.is_zero() {
 return;
 }
 let entry = self.balances.entry(asset.clone()).or_insert_with(AssetBalance::zero);
 entry.wallet += pnl;
 entry.available += pnl;
 }

 /// Locks `amount` of `asset` (e.g. margin reserved for a new order), moving it out of
 /// `available` without touching `wallet`.
 pub fn lock(&mut self, asset: &AssetName, amount: Decimal) {
 let entry = self.balances.entry(asset.clone()).or_insert_with(AssetBalance::zero);
 entry.available -= amount;
 }

 /// Releases a previously locked amount back into `available` (order canceled or filled and
 /// already accounted for via `apply_realized_pnl`).
 pub fn unlock(&mut self, asset: &AssetName, amount: Decimal) {
 let entry = self.balances.entry(asset.clone()).or_insert_with(AssetBalance::zero);
 entry.available += amount;
 }

 /// Replaces the whole sheet wholesale, used by `syncFromExchange` when
 /// reconciling against a venue account snapshot.
 pub fn replace_all(&mut self, balances: HashMap<AssetName, AssetBalance>) {
 self.balances = balances;
 }
}
