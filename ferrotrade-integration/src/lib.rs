//! Shared plumbing used by every I/O-bound FerroTrade crate: channels with overflow tracking,
//! a priority rate limiter, exponential backoff, time-ordered identifiers, signed-request
//! helpers and point-in-time snapshots.

pub mod channel;
pub mod error;
pub mod id;
pub mod rate_limit;
pub mod signing;
pub mod snapshot;

pub use channel::{mpsc_unbounded, BoundedMailbox, Channel, MailboxTx, Tx, UnboundedRx, UnboundedTx};
pub use error::Unrecoverable;
pub use id::Id;
pub use rate_limit::{Backoff, Priority, RateLimiter};
pub use snapshot::Snapshot;
