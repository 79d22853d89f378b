use std::time::Duration;

/// Per-namespace default TTLs . `C2` writes `price:*`/`orderbook:*`/`ticker-24h:*`,
/// `C11` writes `session:*`; every other component is a reader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Namespace {
 Price,
 OrderBook,
 Ticker24h,
 Session,
}

impl Namespace {
 pub fn prefix(&self) -> &'static str {
 match self {
 Self::Price => "price",
 Self::OrderBook => "orderbook",
 Self::Ticker24h => "ticker-24h",
 Self::Session => "session",
 }
 }

 pub fn default_ttl(&self) -> Duration {
 match self {
 Self::Price => Duration::from_secs(30),
 Self::OrderBook => Duration::from_secs(10),
 Self::Ticker24h => Duration::from_secs(300),
 Self::Session => Duration::from_secs(1_800),
 }
 }

 pub fn key(&self, id: &str) -> String {
 format!("{}:{id}", self.prefix)
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn key_is_prefixed_with_namespace() {
 assert_eq!(Namespace::Price.key("BTCUSDT"), "price:BTCUSDT");
 }
}
