use serde::{Deserialize, Serialize};

/// Order lifecycle states . `Filled`, `Cancelled`, `Expired` and `Rejected` are
/// terminal; no event accepted in a terminal state changes it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
 Pending,
 New,
 PartiallyFilled,
 Filled,
 Cancelled,
 Expired,
 Rejected,
}

impl OrderStatus {
 pub fn is_terminal(&self) -> bool {
 matches!(self, Self::Filled | Self::Cancelled | Self::Expired | Self::Rejected)
 }
}

/// An event that may move an [`OrderStatus`] forward (state machine).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum OrderEvent {
 VenueAcked,
 VenueRejected,
 PartialFill,
 FullFill,
 CancelRequested,
 TimeInForceExpired,
}

/// An event that does not apply to the order's current status ("illegal transitions
/// are dropped with a warning").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
 pub current: OrderStatus,
 pub event: OrderEvent,
}

/// A pure `(currentStatus, event) -> nextStatus | InvalidTransition` function (table-
/// driven status transitions, replacing exceptions-for-control-flow): every legal edge in the
/// order lifecycle graph is one match arm; anything else is rejected rather than silently
/// coerced, so a late-arriving `VenueAcked` after `Filled` cannot regress state.
pub fn next_status(current: OrderStatus, event: OrderEvent) -> Result<OrderStatus, InvalidTransition> {
 use OrderEvent::*;
 use OrderStatus::*;

 let next = match (current, event) {
 (Pending, VenueAcked) => New,
 (Pending, VenueRejected) => Rejected,
 (Pending, CancelRequested) => Cancelled,
 // A market order can fill before its ack is even processed; the first status the
 // router ever sees for it is already terminal.
 (Pending, PartialFill) => PartiallyFilled,
 (Pending, FullFill) => Filled,

 (New, PartialFill) => PartiallyFilled,
 (New, FullFill) => Filled,
 (New, CancelRequested) => Cancelled,
 (New, TimeInForceExpired) => Expired,

 (PartiallyFilled, PartialFill) => PartiallyFilled,
 (PartiallyFilled, FullFill) => Filled,
 (PartiallyFilled, CancelRequested) => Cancelled,
 (PartiallyFilled, TimeInForceExpired) => Expired,

 _ => return Err(InvalidTransition { current, event }),
 };

 Ok(next)
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn pending_order_advances_to_new_on_venue_ack() {
 assert_eq!(next_status(OrderStatus::Pending, OrderEvent::VenueAcked), Ok(OrderStatus::New));
 }

 #[test]
 fn a_late_ack_after_filled_is_an_invalid_transition() {
 let result = next_status(OrderStatus::Filled, OrderEvent::VenueAcked);
 assert_eq!(result, Err(InvalidTransition { current: OrderStatus::Filled, event: OrderEvent::VenueAcked }));
 }

 #[test]
 fn cancel_requested_on_a_terminal_state_is_rejected() {
 assert!(next_status(OrderStatus::Cancelled, OrderEvent::CancelRequested).is_err());
 assert!(next_status(OrderStatus::Rejected, OrderEvent::CancelRequested).is_err());
 }

 #[test]
 fn partially_filled_can_receive_further_partial_fills() {
 assert_eq!( next_status(OrderStatus::PartiallyFilled, OrderEvent::PartialFill),
 Ok(OrderStatus::PartiallyFilled)
);
 }
}
