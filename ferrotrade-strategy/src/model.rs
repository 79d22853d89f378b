//! Strategy configuration for the built-in strategy types. Each built-in type has its own
//! parameter struct; `deny_unknown_fields` rejects an unrecognized parameter at deserialize
//! time without a hand-rolled schema validator.

use crate::error::StrategyError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GridParams {
 pub lower_price: Decimal,
 pub upper_price: Decimal,
 pub grid_count: u32,
 pub quantity_per_grid: Decimal,
 pub take_profit_percent: Option<Decimal>,
 pub stop_loss_percent: Option<Decimal>,
}

impl GridParams {
 pub fn validate(&self) -> Result<(), StrategyError> {
 if self.grid_count < 2 {
 return Err(StrategyError::InvalidParameters("gridCount must be >= 2".into()));
 }
 if self.lower_price >= self.upper_price {
 return Err(StrategyError::InvalidParameters("lowerPrice must be < upperPrice".into()));
 }
 if !self.quantity_per_grid.is_sign_positive() || self.quantity_per_grid.is_zero() {
 return Err(StrategyError::InvalidParameters("quantityPerGrid must be positive".into()));
 }
 Ok(())
 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DcaParams {
 pub symbol: String,
 pub interval_seconds: u64,
 pub notional_per_buy: Decimal,
 pub max_position_size: Decimal,
 pub take_profit_percent: Decimal,
}

impl DcaParams {
 pub fn validate(&self) -> Result<(), StrategyError> {
 if self.interval_seconds == 0 {
 return Err(StrategyError::InvalidParameters("intervalSeconds must be positive".into()));
 }
 if !self.notional_per_buy.is_sign_positive() || self.notional_per_buy.is_zero() {
 return Err(StrategyError::InvalidParameters("notionalPerBuy must be positive".into()));
 }
 if self.max_position_size < self.notional_per_buy {
 return Err(StrategyError::InvalidParameters("maxPositionSize must be >= notionalPerBuy".into()));
 }
 Ok(())
 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MomentumParams {
 pub fast_period: usize,
 pub slow_period: usize,
 pub notional: Decimal,
 pub stop_loss_percent: Decimal,
 pub take_profit_percent: Decimal,
}

impl MomentumParams {
 pub fn validate(&self) -> Result<(), StrategyError> {
 if self.fast_period == 0 || self.slow_period == 0 {
 return Err(StrategyError::InvalidParameters("periods must be positive".into()));
 }
 if self.fast_period >= self.slow_period {
 return Err(StrategyError::InvalidParameters("fastPeriod must be < slowPeriod".into()));
 }
 if !self.notional.is_sign_positive() || self.notional.is_zero() {
 return Err(StrategyError::InvalidParameters("notional must be positive".into()));
 }
 Ok(())
 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MeanReversionParams {
 pub period: usize,
 pub z_score_entry: Decimal,
 pub z_score_exit: Decimal,
 pub notional: Decimal,
}

impl MeanReversionParams {
 pub fn validate(&self) -> Result<(), StrategyError> {
 if self.period < 2 {
 return Err(StrategyError::InvalidParameters("period must be >= 2".into()));
 }
 if self.z_score_exit >= self.z_score_entry {
 return Err(StrategyError::InvalidParameters("zScoreExit must be < zScoreEntry".into()));
 }
 if !self.notional.is_sign_positive() || self.notional.is_zero() {
 return Err(StrategyError::InvalidParameters("notional must be positive".into()));
 }
 Ok(())
 }
}

/// The parameter payload of a `Strategy` entity, tagged by `type`. `Custom` is an
/// escape hatch for user-supplied strategy code the built-in factory does not construct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StrategyConfig {
 Grid(GridParams),
 Dca(DcaParams),
 Momentum(MomentumParams),
 MeanReversion(MeanReversionParams),
 Custom(serde_json::Value),
}

impl StrategyConfig {
 pub fn validate(&self) -> Result<(), StrategyError> {
 match self {
 StrategyConfig::Grid(params) => params.validate(),
 StrategyConfig::Dca(params) => params.validate(),
 StrategyConfig::Momentum(params) => params.validate(),
 StrategyConfig::MeanReversion(params) => params.validate(),
 StrategyConfig::Custom(_) => Ok(()),
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use rust_decimal_macros::dec;

 #[test]
 fn unknown_grid_parameter_is_rejected_at_deserialize_time() {
 let json = serde_json::json!({
 "type": "grid",
 "lowerPrice": "100",
 "upperPrice": "200",
 "gridCount": 4,
 "quantityPerGrid": "0.1",
 "leverage": 10
 });
 let result: Result<StrategyConfig, _> = serde_json::from_value(json);
 assert!(result.is_err(), "an unrecognized `leverage` field must be rejected");
 }

 #[test]
 fn grid_count_below_two_fails_validation() {
 let params = GridParams {
 lower_price: dec!(100),
 upper_price: dec!(200),
 grid_count: 1,
 quantity_per_grid: dec!(0.1),
 take_profit_percent: None,
 stop_loss_percent: None,
 };
 assert!(params.validate().is_err());
 }

 #[test]
 fn mean_reversion_requires_exit_threshold_below_entry() {
 let params = MeanReversionParams {
 period: 20,
 z_score_entry: dec!(1.0),
 z_score_exit: dec!(2.0),
 notional: dec!(100),
 };
 assert!(params.validate().is_err());
 }
}
