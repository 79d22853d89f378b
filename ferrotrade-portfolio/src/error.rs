use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortfolioError {
    #[error("position {0} not found")]
    NotFound(String),

    #[error("fill quantity must be positive, got {0}")]
    NonPositiveFillQuantity(String),
}
