//! # FerroTrade
//! Automated cryptocurrency futures trading platform core. Wires exchange adapters, market data
//! ingestion, portfolio accounting, risk enforcement, a strategy-driven bot runtime, a durable
//! job system, an offline backtest engine and a client distribution hub behind a single
//! [`control_plane::ControlPlane`] command surface.
//!
//! Each concern lives in its own workspace crate (`ferrotrade-*`); this root crate owns only the
//! control plane itself — entity stores, the trait-seam implementations gluing the other crates
//! together, and process bootstrap.

pub mod bot_supervisor;
pub mod config;
pub mod control_plane;
pub mod crypto;
pub mod emergency_hooks;
pub mod entities;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod order_placer;
pub mod reconciliation;
pub mod risk_gate;
pub mod sweep_provider;

pub use config::Config;
pub use control_plane::ControlPlane;
pub use error::{CoreError, ErrorKind};
