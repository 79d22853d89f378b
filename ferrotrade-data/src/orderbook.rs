use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Bid/ask side of a depth level keyed by price so level updates and removals (quantity zero)
/// are O(log n), and iteration in price order is free .
#[derive(Debug, Clone, Default)]
struct DepthSide {
 /// Keyed by `-price` scaled so the best (highest) bid sorts first; see [`DepthSide::bids()`].
 levels: BTreeMap<OrderedPrice, Decimal>,
 descending: bool,
}

/// Wraps [`Decimal`] so bids can be stored in descending order in a [`BTreeMap`], which only
/// ever sorts ascending.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
struct OrderedPrice(Decimal);

impl DepthSide {
 fn bids() -> Self {
 Self {
 levels: BTreeMap::new(),
 descending: true,
 }
 }

 fn asks() -> Self {
 Self {
 levels: BTreeMap::new(),
 descending: false,
 }
 }

 fn apply(&mut self, price: Decimal, quantity: Decimal) {
 let key = if self.descending {
 OrderedPrice(-price)
 } else {
 OrderedPrice(price)
 };
 if quantity.is_zero() {
 self.levels.remove(&key);
 } else {
 self.levels.insert(key, quantity);
 }
 }

 fn best(&self) -> Option<(Decimal, Decimal)> {
 self.levels.iter().next().map(|(key, qty)| (self.price_of(*key), *qty))
 }

 fn price_of(&self, key: OrderedPrice) -> Decimal {
 if self.descending {
 -key.0
 } else {
 key.0
 }
 }

 fn levels(&self, depth: usize) -> Vec<(Decimal, Decimal)> {
 self.levels
 .iter()
 .take(depth)
 .map(|(key, qty)| (self.price_of(*key), *qty))
 .collect()
 }
}

/// A local order book maintained from a venue's snapshot + diff protocol, following the
/// documented `U/u/pu` sequence rule: a diff applies only if it is contiguous
/// with the last applied update; any gap requires a fresh snapshot before further diffs apply.
#[derive(Debug, Clone)]
pub struct OrderBook {
 bids: DepthSide,
 asks: DepthSide,
 last_update_id: Option<u64>,
}

impl Default for OrderBook {
 fn default() -> Self {
 Self {
 bids: DepthSide::bids(),
 asks: DepthSide::asks(),
 last_update_id: None,
 }
 }
}

impl OrderBook {
 pub fn new() -> Self {
 Self::default()
 }

 /// Replaces the book outright with a fresh snapshot, establishing the baseline sequence for
 /// subsequent diffs.
 pub fn apply_snapshot( &mut self,
 last_update_id: u64,
 bids: Vec<(Decimal, Decimal)>,
 asks: Vec<(Decimal, Decimal)>,
) {
 self.bids = DepthSide::bids();
 self.asks = DepthSide::asks();
 for (price, qty) in bids {
 self.bids.apply(price, qty);
 }
 for (price, qty) in asks {
 self.asks.apply(price, qty);
 }
 self.last_update_id = Some(last_update_id);
 }

 /// Applies one diff frame. Returns `false` (a sequence gap) when `first_update_id` does not
 /// immediately follow the last applied id; the caller must then request a fresh snapshot
 /// before calling this again, per the venue's documented gap-handling rule.
 pub fn apply_diff( &mut self,
 first_update_id: u64,
 final_update_id: u64,
 bids: Vec<(Decimal, Decimal)>,
 asks: Vec<(Decimal, Decimal)>,
) -> bool {
 let Some(last) = self.last_update_id else {
 return false;
 };
 if final_update_id <= last {
 return true; // stale frame already covered by a prior update; not a gap
 }
 if first_update_id > last + 1 {
 return false;
 }

 for (price, qty) in bids {
 self.bids.apply(price, qty);
 }
 for (price, qty) in asks {
 self.asks.apply(price, qty);
 }
 self.last_update_id = Some(final_update_id);
 true
 }

 pub fn is_synced(&self) -> bool {
 self.last_update_id.is_some()
 }

 pub fn reset(&mut self) {
 *self = Self::default();
 }

 pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
 self.bids.best
 }

 pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
 self.asks.best
 }

 pub fn bids(&self, depth: usize) -> Vec<(Decimal, Decimal)> {
 self.bids.levels(depth)
 }

 pub fn asks(&self, depth: usize) -> Vec<(Decimal, Decimal)> {
 self.asks.levels(depth)
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use rust_decimal_macros::dec;

 #[test]
 fn snapshot_establishes_best_bid_and_ask() {
 let mut book = OrderBook::new();
 book.apply_snapshot( 100,
 vec![(dec!(100), dec!(1)), (dec!(99), dec!(2))],
 vec![(dec!(101), dec!(1)), (dec!(102), dec!(2))],
);
 assert_eq!(book.best_bid, Some((dec!(100), dec!(1))));
 assert_eq!(book.best_ask, Some((dec!(101), dec!(1))));
 }

 #[test]
 fn contiguous_diff_applies_and_can_remove_a_level() {
 let mut book = OrderBook::new();
 book.apply_snapshot(100, vec![(dec!(100), dec!(1))], vec![(dec!(101), dec!(1))]);
 let applied = book.apply_diff(101, 102, vec![(dec!(100), dec!(0))], vec![(dec!(101), dec!(3))]);
 assert!(applied);
 assert_eq!(book.best_bid, None);
 assert_eq!(book.best_ask, Some((dec!(101), dec!(3))));
 }

 #[test]
 fn sequence_gap_is_reported_and_requires_re_snapshot() {
 let mut book = OrderBook::new();
 book.apply_snapshot(100, vec![], vec![]);
 let applied = book.apply_diff(105, 110, vec![], vec![]);
 assert!(!applied);
 }

 #[test]
 fn stale_diff_before_snapshot_baseline_is_ignored_without_reporting_a_gap() {
 let mut book = OrderBook::new();
 book.apply_snapshot(100, vec![(dec!(50), dec!(1))], vec![]);
 let applied = book.apply_diff(90, 95, vec![(dec!(50), dec!(9))], vec![]);
 assert!(applied);
 assert_eq!(book.best_bid, Some((dec!(50), dec!(1))), "stale frame must not mutate state");
 }
}
