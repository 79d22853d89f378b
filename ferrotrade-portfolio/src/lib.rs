//! The Portfolio Store: the authoritative per-user record of balances and
//! positions. Applies fills with weighted-average entry pricing and FIFO-equivalent realized
//! P&L, re-marks open positions, and reconciles against venue account/position snapshots.

pub mod balance;
pub mod error;
pub mod position;
pub mod repository;
pub mod store;

pub use balance::{AssetBalance, BalanceSheet};
pub use error::PortfolioError;
pub use position::{ClosedTrade, Fill, Position, PositionSide, Side};
pub use repository::{InMemoryPortfolioRepository, PortfolioRepository};
pub use store::{ApplyFillOutcome, PortfolioStore, ReconciliationDiscrepancy, DEFAULT_RECONCILIATION_TOLERANCE};
