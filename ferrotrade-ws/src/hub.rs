use crate::error::WsError;
use crate::subscription::{ClientMessage, HubEvent, ServerMessage, Subscriber, Topic, DEFAULT_MAILBOX_CAPACITY, EVICTION_THRESHOLD};
use ferrotrade_integration::channel::{BoundedMailbox, MailboxTx};
use ferrotrade_integration::Id;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// The shared fan-out graph every session registers against: one entry per
/// [`Topic`], each holding the mailbox senders of every session currently subscribed to it.
/// Cheaply `Clone`d — every session and every publisher shares the same `Inner`.
pub struct Hub {
 inner: Arc<Inner>,
}

impl Clone for Hub {
 fn clone(&self) -> Self {
 Self { inner: Arc::clone(&self.inner) }
 }
}

struct Inner {
 subscribers: Mutex<HashMap<Topic, Vec<Subscriber>>>,
}

impl Default for Hub {
 fn default() -> Self {
 Self::new()
 }
}

impl Hub {
 pub fn new() -> Self {
 Self {
 inner: Arc::new(Inner { subscribers: Mutex::new(HashMap::new()) }),
 }
 }

 /// Publishes `payload` to every session currently subscribed to `topic`, evicting any
 /// session whose mailbox has overflowed past [`EVICTION_THRESHOLD`] (the slow-consumer rule).
 pub fn publish(&self, topic: &Topic, payload: serde_json::Value) {
 let mut subscribers = self.inner.subscribers.lock();
 let Some(list) = subscribers.get_mut(topic) else {
 return;
 };

 let event = HubEvent::Data { topic: topic.clone(), payload };
 list.retain_mut(|subscriber| {
 if subscriber.tx.try_send(event.clone()) {
 return true;
 }
 if subscriber.tx.overflow_count < EVICTION_THRESHOLD {
 return true;
 }
 warn!(session_id = %subscriber.id, ?topic, "evicting slow consumer");
 let _ = subscriber.tx.try_send(HubEvent::Evicted { reason: "slow-consumer".to_string() });
 false
 });
 }

 /// Registers `session_id`'s mailbox against `topic`, enforcing that private channels may
 /// only be subscribed by the session they are scoped to (per-user isolation).
 pub fn subscribe(&self, session_id: Id, session_user: Id, topic: Topic, tx: MailboxTx<HubEvent>) -> Result<(), WsError> {
 if let Some(owner) = topic.scoped_user {
 if owner != session_user {
 return Err(WsError::UserScopeMismatch(topic));
 }
 }
 let mut subscribers = self.inner.subscribers.lock();
 let list = subscribers.entry(topic).or_default();
 list.retain(|subscriber| subscriber.id != session_id);
 list.push(Subscriber { id: session_id, tx });
 Ok(())
 }

 pub fn unsubscribe(&self, session_id: Id, topic: &Topic) {
 let mut subscribers = self.inner.subscribers.lock();
 if let Some(list) = subscribers.get_mut(topic) {
 list.retain(|subscriber| subscriber.id != session_id);
 }
 }

 /// Drops every subscription held by `session_id`, across all topics (session
 /// cleanup on disconnect).
 pub fn disconnect(&self, session_id: Id) {
 let mut subscribers = self.inner.subscribers.lock();
 for list in subscribers.values_mut() {
 list.retain(|subscriber| subscriber.id != session_id);
 }
 subscribers.retain(|_, list| !list.is_empty());
 }

 #[cfg(test)]
 pub(crate) fn subscriber_count(&self, topic: &Topic) -> usize {
 self.inner.subscribers.lock().get(topic).map(Vec::len).unwrap_or(0)
 }
}

/// One session's view of the hub: its own mailbox plus the bookkeeping needed to react to a
/// [`ClientMessage`] and clean up on disconnect.
pub struct Session {
 pub id: Id,
 pub user: Id,
 hub: Hub,
 mailbox: BoundedMailbox<HubEvent>,
 subscribed: Vec<Topic>,
}

impl Session {
 pub fn new(hub: Hub, user: Id) -> Self {
 Self {
 id: Id::new(),
 user,
 hub,
 mailbox: BoundedMailbox::new(DEFAULT_MAILBOX_CAPACITY),
 subscribed: Vec::new(),
 }
 }

 pub async fn recv(&mut self) -> Option<HubEvent> {
 self.mailbox.rx.recv().await
 }

 /// Applies one inbound client frame, returning the server frame to send back.
 pub fn handle(&mut self, message: ClientMessage) -> ServerMessage {
 match message {
 ClientMessage::Subscribe { topic } => {
 let tx = MailboxTx::new(self.mailbox.tx.clone());
 match self.hub.subscribe(self.id, self.user, topic.clone(), tx) {
 Ok(()) => {
 self.subscribed.push(topic.clone());
 ServerMessage::Subscribed { topic }
 }
 Err(err) => ServerMessage::Error { message: err.to_string() },
 }
 }
 ClientMessage::Unsubscribe { topic } => {
 self.hub.unsubscribe(self.id, &topic);
 self.subscribed.retain(|t| t != &topic);
 ServerMessage::Unsubscribed { topic }
 }
 }
 }
}

impl Drop for Session {
 fn drop(&mut self) {
 self.hub.disconnect(self.id);
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use serde_json::json;

 #[test]
 fn subscribing_to_a_public_topic_never_checks_user_scope() {
 let hub = Hub::new();
 let mut session = Session::new(hub.clone(), Id::new());
 let reply = session.handle(ClientMessage::Subscribe { topic: Topic::Ticker { symbol: "BTCUSDT".to_string() } });
 assert!(matches!(reply, ServerMessage::Subscribed { .. }));
 assert_eq!(hub.subscriber_count(&Topic::Ticker { symbol: "BTCUSDT".to_string() }), 1);
 }

 #[test]
 fn subscribing_to_another_users_private_topic_is_rejected() {
 let hub = Hub::new();
 let mut session = Session::new(hub.clone(), Id::new());
 let someone_else = Id::new();
 let reply = session.handle(ClientMessage::Subscribe { topic: Topic::Orders { user: someone_else } });
 assert!(matches!(reply, ServerMessage::Error { .. }));
 assert_eq!(hub.subscriber_count(&Topic::Orders { user: someone_else }), 0);
 }

 #[test]
 fn subscribing_to_ones_own_private_topic_succeeds() {
 let hub = Hub::new();
 let user = Id::new();
 let mut session = Session::new(hub.clone(), user);
 let reply = session.handle(ClientMessage::Subscribe { topic: Topic::Orders { user } });
 assert!(matches!(reply, ServerMessage::Subscribed { .. }));
 }

 #[test]
 fn unsubscribing_removes_the_session_from_the_topic() {
 let hub = Hub::new();
 let mut session = Session::new(hub.clone(), Id::new());
 let topic = Topic::Ticker { symbol: "ETHUSDT".to_string() };
 session.handle(ClientMessage::Subscribe { topic: topic.clone() });
 session.handle(ClientMessage::Unsubscribe { topic: topic.clone() });
 assert_eq!(hub.subscriber_count(&topic), 0);
 }

 #[test]
 fn dropping_a_session_cleans_up_every_subscription() {
 let hub = Hub::new();
 let topic = Topic::Ticker { symbol: "BTCUSDT".to_string() };
 {
 let mut session = Session::new(hub.clone(), Id::new());
 session.handle(ClientMessage::Subscribe { topic: topic.clone() });
 assert_eq!(hub.subscriber_count(&topic), 1);
 }
 assert_eq!(hub.subscriber_count(&topic), 0);
 }

 #[test]
 fn publishing_fans_out_to_every_subscriber() {
 let hub = Hub::new();
 let topic = Topic::Ticker { symbol: "BTCUSDT".to_string() };
 let mut a = Session::new(hub.clone(), Id::new());
 let mut b = Session::new(hub.clone(), Id::new());
 a.handle(ClientMessage::Subscribe { topic: topic.clone() });
 b.handle(ClientMessage::Subscribe { topic: topic.clone() });

 hub.publish(&topic, json!({ "last_price": "100" }));

 assert!(matches!(a.mailbox.rx.try_recv(), Ok(HubEvent::Data { .. })));
 assert!(matches!(b.mailbox.rx.try_recv(), Ok(HubEvent::Data { .. })));
 }
}
