use crate::error::Unrecoverable;
use derive_more::{Constructor, Display};
use futures::{Sink, Stream};
use serde::{Deserialize, Serialize};
use std::{
 fmt::Debug,
 pin::Pin,
 task::{Context, Poll},
};
use tracing::warn;

/// A sender half capable of forwarding an `Item` to some receiver.
pub trait Tx
where
 Self: Debug + Clone + Send,
{
 type Item;
 type Error: Unrecoverable + Debug;
 fn send<Item: Into<Self::Item>>(&self, item: Item) -> Result<(), Self::Error>;
}

/// Convenience type bundling the [`UnboundedTx`] and [`UnboundedRx`] halves of a channel.
#[derive(Debug)]
pub struct Channel<T> {
 pub tx: UnboundedTx<T>,
 pub rx: UnboundedRx<T>,
}

impl<T> Channel<T> {
 pub fn new() -> Self {
 let (tx, rx) = mpsc_unbounded();
 Self { tx, rx }
 }
}

impl<T> Default for Channel<T> {
 fn default() -> Self {
 Self::new()
 }
}

#[derive(Debug, Clone)]
pub struct UnboundedTx<T> {
 pub tx: tokio::sync::mpsc::UnboundedSender<T>,
}

impl<T> UnboundedTx<T> {
 pub fn new(tx: tokio::sync::mpsc::UnboundedSender<T>) -> Self {
 Self { tx }
 }
}

impl<T> Tx for UnboundedTx<T>
where
 T: Debug + Clone + Send,
{
 type Item = T;
 type Error = tokio::sync::mpsc::error::SendError<T>;

 fn send<Item: Into<Self::Item>>(&self, item: Item) -> Result<(), Self::Error> {
 self.tx.send(item.into())
 }
}

impl<T> Sink<T> for UnboundedTx<T> {
 type Error = tokio::sync::mpsc::error::SendError<T>;

 fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
 Poll::Ready(Ok(()))
 }

 fn start_send(self: Pin<&mut Self>, item: T) -> Result<(), Self::Error> {
 self.tx.send(item)
 }

 fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
 Poll::Ready(Ok(()))
 }

 fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
 Poll::Ready(Ok(()))
 }
}

#[derive(Debug, Constructor)]
pub struct UnboundedRx<T> {
 pub rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

impl<T> UnboundedRx<T> {
 pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<T> {
 tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
 }
}

impl<T> Stream for UnboundedRx<T> {
 type Item = T;

 fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
 self.rx.poll_recv(cx)
 }
}

pub fn mpsc_unbounded<T>() -> (UnboundedTx<T>, UnboundedRx<T>) {
 let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
 (UnboundedTx::new(tx), UnboundedRx::new(rx))
}

/// A bounded mailbox with overflow tracking, used by the Market-Data Hub and the
/// Client Distribution Hub where a slow consumer must be detected and evicted
/// rather than allowed to apply back-pressure to the publisher.
#[derive(Debug)]
pub struct BoundedMailbox<T> {
 pub tx: tokio::sync::mpsc::Sender<T>,
 pub rx: tokio::sync::mpsc::Receiver<T>,
 dropped: std::sync::atomic::AtomicU64,
}

impl<T> BoundedMailbox<T> {
 pub fn new(capacity: usize) -> Self {
 let (tx, rx) = tokio::sync::mpsc::channel(capacity);
 Self {
 tx,
 rx,
 dropped: std::sync::atomic::AtomicU64::new(0),
 }
 }
}

/// Sender half of a [`BoundedMailbox`] that drops the oldest-style overflow signal: rather than
/// awaiting a full channel, `try_send` reports overflow so the caller can increment a
/// `slow-consumer` counter and evict the subscriber after sustained overflow.
#[derive(Debug, Clone)]
pub struct MailboxTx<T> {
 tx: tokio::sync::mpsc::Sender<T>,
 overflow_count: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl<T> MailboxTx<T> {
 pub fn new(tx: tokio::sync::mpsc::Sender<T>) -> Self {
 Self {
 tx,
 overflow_count: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
 }
 }

 /// Attempt to deliver `item`. Returns `false` on overflow and bumps the slow-consumer
 /// counter; the caller decides eviction policy.
 pub fn try_send(&self, item: T) -> bool {
 match self.tx.try_send(item) {
 Ok(()) => true,
 Err(_) => {
 self.overflow_count
 .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
 false
 }
 }
 }

 pub fn overflow_count(&self) -> u64 {
 self.overflow_count.load(std::sync::atomic::Ordering::Relaxed)
 }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize)]
pub struct ChannelTxDroppable<ChannelTx> {
 pub state: ChannelState<ChannelTx>,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx> {
 pub fn new(tx: ChannelTx) -> Self {
 Self {
 state: ChannelState::Active(tx),
 }
 }

 pub fn new_disabled() -> Self {
 Self {
 state: ChannelState::Disabled,
 }
 }

 pub fn disable(&mut self) {
 self.state = ChannelState::Disabled
 }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Display)]
pub enum ChannelState<Tx> {
 Active(Tx),
 Disabled,
}

impl<ChannelTx> ChannelTxDroppable<ChannelTx>
where
 ChannelTx: Tx,
{
 pub fn send(&mut self, item: ChannelTx::Item) {
 let ChannelState::Active(tx) = &self.state else {
 return;
 };

 if tx.send(item).is_err() {
 let name = std::any::type_name::<ChannelTx::Item>;
 warn!(name, "channel receiver dropped - items will no longer be sent");
 self.state = ChannelState::Disabled
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[tokio::test]
 async fn unbounded_channel_round_trips_items() {
 let (tx, mut rx) = mpsc_unbounded::<u32>;
 tx.send(7u32).unwrap();
 assert_eq!(rx.rx.recv().await, Some(7));
 }

 #[test]
 fn mailbox_tx_reports_overflow_past_capacity() {
 let mailbox = BoundedMailbox::<u32>::new(1);
 let tx = MailboxTx::new(mailbox.tx.clone());
 assert!(tx.try_send(1));
 assert!(!tx.try_send(2));
 assert_eq!(tx.overflow_count, 1);
 }
}
