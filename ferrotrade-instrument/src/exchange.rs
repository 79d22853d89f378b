use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A trading venue. The core assumes linear USDⓈ-margined perpetuals but is venue-pluggable
/// ; only the initial Binance USDⓈ-M Futures venue is modelled today.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Display)]
pub enum ExchangeId {
 #[display("binance_usd_futures")]
 BinanceUsdFutures,
}

/// Mainnet vs. testnet, per the `ExchangeConnection.env` field .
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
pub enum Environment {
 Mainnet,
 Testnet,
}

impl ExchangeId {
 /// The default REST base URL for this venue/environment, overridable via
 /// `exchangeBaseUrls` configuration .
 pub fn default_rest_base_url(&self, env: Environment) -> &'static str {
 match (self, env) {
 (Self::BinanceUsdFutures, Environment::Mainnet) => "https://fapi.binance.com",
 (Self::BinanceUsdFutures, Environment::Testnet) => "https://testnet.binancefuture.com",
 }
 }

 /// The default market/user-data stream base URL.
 pub fn default_ws_base_url(&self, env: Environment) -> &'static str {
 match (self, env) {
 (Self::BinanceUsdFutures, Environment::Mainnet) => "wss://fstream.binance.com",
 (Self::BinanceUsdFutures, Environment::Testnet) => "wss://stream.binancefuture.com",
 }
 }
}
