//! Encrypts `ExchangeConnection` secret keys at rest ("credentials encrypted-at-rest
//! ... decrypted only inside C1 at call time"). The control plane never holds a decrypted
//! secret key longer than the call that builds an adapter from it.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
 #[error("credential encryption key must be 32 bytes once decoded, got {0}")]
 InvalidKeyLength(usize),
 #[error("ciphertext is malformed or truncated")]
 MalformedCiphertext,
 #[error("decryption failed, key or ciphertext is wrong")]
 DecryptionFailed,
}

fn cipher(encryption_key: &str) -> Result<Aes256Gcm, CryptoError> {
 let raw = encryption_key.as_bytes();
 if raw.len() != 32 {
 return Err(CryptoError::InvalidKeyLength(raw.len()));
 }
 Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(raw)))
}

/// Encrypts `secret_key` under `encryption_key`, returning a base64 blob of `nonce || ciphertext`.
pub fn encrypt_secret(encryption_key: &str, secret_key: &str) -> Result<String, CryptoError> {
 let cipher = cipher(encryption_key)?;
 let mut nonce_bytes = [0u8; NONCE_LEN];
 rand::rng().fill_bytes(&mut nonce_bytes);
 let nonce = Nonce::from_slice(&nonce_bytes);

 let ciphertext = cipher
 .encrypt(nonce, secret_key.as_bytes())
 .map_err(|_| CryptoError::DecryptionFailed)?;

 let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
 blob.extend_from_slice(&nonce_bytes);
 blob.extend_from_slice(&ciphertext);
 Ok(BASE64.encode(blob))
}

/// Decrypts a blob produced by [`encrypt_secret`]. Called only from inside the adapter
/// construction path, never stored anywhere.
pub fn decrypt_secret(encryption_key: &str, encrypted: &str) -> Result<String, CryptoError> {
 let cipher = cipher(encryption_key)?;
 let blob = BASE64.decode(encrypted).map_err(|_| CryptoError::MalformedCiphertext)?;
 if blob.len() < NONCE_LEN {
 return Err(CryptoError::MalformedCiphertext);
 }
 let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
 let nonce = Nonce::from_slice(nonce_bytes);

 let plaintext = cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::DecryptionFailed)?;
 String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
 use super::*;

 const KEY: &str = "01234567890123456789012345678901";

 #[test]
 fn a_secret_round_trips_through_encrypt_then_decrypt() {
 let encrypted = encrypt_secret(KEY, "super-secret-api-key").unwrap();
 assert_eq!(decrypt_secret(KEY, &encrypted).unwrap(), "super-secret-api-key");
 }

 #[test]
 fn decrypting_with_the_wrong_key_fails() {
 let encrypted = encrypt_secret(KEY, "super-secret-api-key").unwrap();
 let wrong_key = "10987654321098765432109876543210";
 assert!(decrypt_secret(wrong_key, &encrypted).is_err());
 }

 #[test]
 fn a_short_encryption_key_is_rejected() {
 assert!(matches!(encrypt_secret("too-short", "x"), Err(CryptoError::InvalidKeyLength(_))));
 }
}
