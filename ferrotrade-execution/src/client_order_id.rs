use chrono::{DateTime, Utc};
use ferrotrade_integration::Id;
use fnv::FnvHasher;
use std::hash::{Hash, Hasher};

const BINANCE_CLIENT_ORDER_ID_MAX_LEN: usize = 36;

/// Deterministically derives a `clientOrderId` from `(userId, timestamp, randomness)`:
/// venues use this as the idempotency key, so the same three inputs must always
/// produce the same id, while two different orders (even submitted in the same millisecond)
/// must not collide. The id is hex, lower-case, and fits Binance's 36-character ceiling.
pub fn generate_client_order_id(user: Id, timestamp: DateTime<Utc>, randomness: u64) -> String {
    let mut hasher = FnvHasher::default();
    user.as_uuid().hash(&mut hasher);
    timestamp.timestamp_millis().hash(&mut hasher);
    randomness.hash(&mut hasher);
    let digest = hasher.finish();

    let id = format!("ft-{digest:016x}-{randomness:08x}");
    debug_assert!(id.len() <= BINANCE_CLIENT_ORDER_ID_MAX_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_same_inputs_always_produce_the_same_id() {
        let user = Id::new();
        let timestamp = Utc::now();
        assert_eq!(
            generate_client_order_id(user, timestamp, 42),
            generate_client_order_id(user, timestamp, 42)
        );
    }

    #[test]
    fn different_randomness_produces_different_ids() {
        let user = Id::new();
        let timestamp = Utc::now();
        assert_ne!(
            generate_client_order_id(user, timestamp, 1),
            generate_client_order_id(user, timestamp, 2)
        );
    }

    #[test]
    fn generated_id_fits_the_venue_length_ceiling() {
        let id = generate_client_order_id(Id::new(), Utc::now(), u64::MAX);
        assert!(id.len() <= BINANCE_CLIENT_ORDER_ID_MAX_LEN);
    }
}
