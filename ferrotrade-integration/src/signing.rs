use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs a canonical query string for a venue's SIGNED REST endpoints, here:
/// `signature = HMAC-SHA256(secretKey, canonicalQueryString)`.
pub fn hmac_sha256_hex(secret: &str, canonical_query: &str) -> String {
 let mut mac =
 HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
 mac.update(canonical_query.as_bytes());
 hex::encode(mac.finalize().into_bytes())
}

/// Builds the canonical query string for a SIGNED request: the caller's parameters, already
/// percent-encoded and ordered deterministically, followed by `timestamp` and `recvWindow`.
pub fn canonical_query(params: &[(&str, String)], timestamp_ms: i64, recv_window_ms: u64) -> String {
 let mut parts: Vec<String> = params
 .iter()
 .map(|(key, value)| format!("{key}={value}"))
 .collect();
 parts.push(format!("timestamp={timestamp_ms}"));
 parts.push(format!("recvWindow={recv_window_ms}"));
 parts.join("&")
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn signature_is_deterministic_for_same_input() {
 let query = canonical_query(&[("symbol", "BTCUSDT".into())], 1_700_000_000_000, 5000);
 let sig_a = hmac_sha256_hex("secret", &query);
 let sig_b = hmac_sha256_hex("secret", &query);
 assert_eq!(sig_a, sig_b);
 assert_eq!(sig_a.len(), 64, "sha256 hex digest is 64 chars");
 }

 #[test]
 fn different_secrets_produce_different_signatures() {
 let query = canonical_query(&[], 1_700_000_000_000, 5000);
 assert_ne!(hmac_sha256_hex("a", &query), hmac_sha256_hex("b", &query));
 }
}
