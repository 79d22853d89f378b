use ferrotrade_integration::channel::MailboxTx;
use ferrotrade_integration::Id;
use serde::{Deserialize, Serialize};

/// Default per-session mailbox depth. Sustained overflow past this, tracked by
/// [`MailboxTx::overflow_count`], triggers eviction .
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1_024;

/// Consecutive-overflow threshold past which a session is kicked rather than merely dropping
/// messages — mirrors the Market-Data Hub's eviction policy since both are
/// bounded-mailbox fan-outs behind a single publisher.
pub const EVICTION_THRESHOLD: u64 = 200;

/// Every channel a session may subscribe to . `Ticker`/`Trades`/`Depth`/`Candle` are
/// public market channels keyed by symbol; the rest are private, scoped to exactly one user.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "kebab-case")]
pub enum Topic {
 Ticker { symbol: String },
 Trades { symbol: String },
 Depth { symbol: String },
 Candle { symbol: String, interval: String },
 Orders { user: Id },
 Positions { user: Id },
 UserTrades { user: Id },
 RiskAlerts { user: Id },
 BotStatus { user: Id },
}

impl Topic {
 /// The user a private channel is scoped to, if any. Public market channels return `None`
 /// and are reachable from any session.
 pub fn scoped_user(&self) -> Option<Id> {
 match self {
 Topic::Ticker { .. } | Topic::Trades { .. } | Topic::Depth { .. } | Topic::Candle { .. } => None,
 Topic::Orders { user }
 | Topic::Positions { user }
 | Topic::UserTrades { user }
 | Topic::RiskAlerts { user }
 | Topic::BotStatus { user } => Some(*user),
 }
 }
}

/// One inbound client frame: subscribe to or drop a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
 Subscribe { topic: Topic },
 Unsubscribe { topic: Topic },
}

/// One outbound server frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
 Subscribed { topic: Topic },
 Unsubscribed { topic: Topic },
 Event { topic: Topic, payload: serde_json::Value },
 Error { message: String },
 Evicted { reason: String },
}

/// What travels through a session's internal mailbox: either a published event to forward, or
/// the terminal eviction notice the hub sends before closing the channel.
#[derive(Debug, Clone)]
pub enum HubEvent {
 Data { topic: Topic, payload: serde_json::Value },
 Evicted { reason: String },
}

pub(crate) struct Subscriber {
 pub id: Id,
 pub tx: MailboxTx<HubEvent>,
}
