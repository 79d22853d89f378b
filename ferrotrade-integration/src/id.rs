use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Time-ordered 128-bit identifier for any externally-addressable core entity (User, Bot,
/// Order, Position, Job, ...), here: "sortable by creation time". Backed by UUIDv7,
/// whose first 48 bits are a millisecond Unix timestamp, so lexicographic/`Ord` comparison of
/// two `Id`s agrees with creation-time ordering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
 /// Generate a new `Id` stamped with the current time.
 pub fn new() -> Self {
 Self(Uuid::now_v7)
 }

 /// Construct an `Id` from a raw UUID, e.g. when deserializing persisted rows.
 pub fn from_uuid(uuid: Uuid) -> Self {
 Self(uuid)
 }

 pub fn as_uuid(&self) -> Uuid {
 self.0
 }
}

impl Default for Id {
 fn default() -> Self {
 Self::new()
 }
}

impl std::str::FromStr for Id {
 type Err = uuid::Error;

 fn from_str(s: &str) -> Result<Self, Self::Err> {
 Uuid::parse_str(s).map(Self)
 }
}

impl fmt::LowerHex for Id {
 fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
 write!(f, "{:x}", self.0.as_u128())
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn ids_generated_later_sort_after_earlier_ones() {
 let a = Id::new();
 std::thread::sleep(std::time::Duration::from_millis(2));
 let b = Id::new();
 assert!(a < b);
 }

 #[test]
 fn id_round_trips_through_json() {
 let id = Id::new();
 let json = serde_json::to_string(&id).unwrap();
 let back: Id = serde_json::from_str(&json).unwrap();
 assert_eq!(id, back);
 }

 #[test]
 fn id_round_trips_through_its_display_format() {
 let id = Id::new();
 let parsed: Id = id.to_string().parse().unwrap();
 assert_eq!(id, parsed);
 }
}
