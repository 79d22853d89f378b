//! Bot Runtime: the lifecycle state machine, the strategy trait surface, the
//! built-in strategies, a small technical-indicator toolkit, and per-bot checkpointing to
//! Cache. The Control Plane owns spawning and command routing; this crate owns what happens
//! inside one running bot.

pub mod checkpoint;
pub mod error;
pub mod model;
pub mod runtime;
pub mod state_machine;
pub mod strategies;
pub mod strategy;
pub mod ta;

pub use checkpoint::{CheckpointBackend, CheckpointStore};
pub use error::StrategyError;
pub use model::StrategyConfig;
pub use runtime::{AlwaysReady, BotCommand, BotRuntime, OrderPlacer, Preflight, RuntimeEvent};
pub use state_machine::{next_status, BotStatus, InvalidBotTransition, StateEvent};
pub use strategies::build() as build_strategy;
pub use strategy::{MarketTick, Strategy, StrategyAction, TickEvent};
