use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A Bot's lifecycle status: `pending → starting → active → (paused | stopping) →
/// … → stopped`, with any non-terminal state able to fall into `error`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum BotStatus {
 Pending,
 Starting,
 Active,
 Paused,
 Stopping,
 Stopped,
 Error,
}

impl BotStatus {
 pub fn is_terminal(&self) -> bool {
 matches!(self, BotStatus::Stopped | BotStatus::Error)
 }
}

/// An input to the lifecycle transition table. `PreflightPassed`/`PreflightFailed` are the
/// runtime's own report of `start`'s pre-flight checks; the rest originate from the Control
/// Plane's command surface or from an unhandled failure in a tick/lifecycle hook.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StateEvent {
 Start,
 PreflightPassed,
 PreflightFailed,
 Pause,
 Resume,
 Stop,
 StopCompleted,
 Fail,
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("cannot apply {event:?} to a bot in {current:?}")]
pub struct InvalidBotTransition {
 pub current: BotStatus,
 pub event: StateEvent,
}

/// Pure lifecycle transition table . A failed pre-flight returns the bot to
/// `stopped` rather than `error`: it is an expected, handled rejection (`PreflightFailed` is a
/// named `startBot` failure kind, not an invariant violation), and `start` is legal again
/// from `stopped`. `error` is reserved for unhandled failures during an active tick/lifecycle
/// hook, and is absorbing like `stopped` — a further `Fail` against either is rejected.
pub fn next_status(current: BotStatus, event: StateEvent) -> Result<BotStatus, InvalidBotTransition> {
 use BotStatus::*;
 use StateEvent::*;

 let next = match (current, event) {
 (Pending | Paused | Stopped, Start) => Starting,
 (Starting, PreflightPassed) => Active,
 (Starting, PreflightFailed) => Stopped,
 (Active, Pause) => Paused,
 (Paused, Resume) => Active,
 (Starting | Active | Paused, Stop) => Stopping,
 (Stopping, StopCompleted) => Stopped,
 (current, Fail) if !current.is_terminal() => Error,
 _ => return Err(InvalidBotTransition { current, event }),
 };
 Ok(next)
}
