pub mod dca;
pub mod grid;
pub mod mean_reversion;
pub mod momentum;

pub use dca::DcaStrategy;
pub use grid::GridStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;

use crate::error::StrategyError;
use crate::model::StrategyConfig;
use crate::strategy::Strategy;

/// Constructs the built-in `Strategy` implementation for a validated [`StrategyConfig`].
/// `Custom` strategies are user-supplied code and are not constructed here.
pub fn build(symbol: impl Into<String>, config: &StrategyConfig) -> Result<Box<dyn Strategy>, StrategyError> {
    config.validate()?;
    let symbol = symbol.into();

    let strategy: Box<dyn Strategy> = match config {
        StrategyConfig::Grid(params) => Box::new(GridStrategy::new(symbol, params.clone())),
        StrategyConfig::Dca(params) => Box::new(DcaStrategy::new(params.clone())),
        StrategyConfig::Momentum(params) => Box::new(MomentumStrategy::new(symbol, params.clone())),
        StrategyConfig::MeanReversion(params) => Box::new(MeanReversionStrategy::new(symbol, params.clone())),
        StrategyConfig::Custom(_) => {
            return Err(StrategyError::InvalidParameters(
                "custom strategies require an externally supplied implementation".to_string(),
            ))
        }
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn build_rejects_invalid_parameters_before_constructing() {
        let config = StrategyConfig::Grid(crate::model::GridParams {
            lower_price: dec!(100),
            upper_price: dec!(50),
            grid_count: 4,
            quantity_per_grid: dec!(1),
            take_profit_percent: None,
            stop_loss_percent: None,
        });
        assert!(build("BTCUSDT", &config).is_err());
    }

    #[test]
    fn build_rejects_custom_strategies() {
        let config = StrategyConfig::Custom(serde_json::json!({}));
        assert!(build("BTCUSDT", &config).is_err());
    }
}
