//! The Client Distribution Hub: fans out market data and per-user account events
//! to connected WebSocket clients over a bounded, evicting mailbox per session — the same
//! back-pressure policy the Market-Data Hub uses internally, extended with a
//! per-user isolation check so one client can never subscribe to another's private channels.

pub mod error;
pub mod handler;
pub mod hub;
pub mod subscription;

pub use error::WsError;
pub use handler::{upgrade, AuthenticatedUser, WsState};
pub use hub::{Hub, Session};
pub use subscription::{ClientMessage, HubEvent, ServerMessage, Topic};
