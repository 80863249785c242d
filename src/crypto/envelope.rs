//! AES-256-GCM sealing of sensitive form fields.
//!
//! A sealed envelope is the transport-safe string a client submits in
//! place of a plaintext password or card field.  The payload is the
//! canonical JSON encoding of the value, so strings, numbers, and small
//! objects all round-trip through the same two functions.
//!
//! Layout of the encoded buffer:
//!   base64( [ 12-byte nonce | ciphertext + 16-byte auth tag ] )
//!
//! Each call to `seal` generates a fresh random nonce, so sealing the
//! same value twice produces different envelopes; both open to the
//! identical value.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use crate::errors::{CarePortalError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Seal `value` under a 32-byte `key` into a transport envelope string.
///
/// The plaintext never appears in the returned value or in any error.
pub fn seal<T: Serialize>(key: &[u8], value: &T) -> Result<String> {
    let mut payload = serde_json::to_vec(value)
        .map_err(|e| CarePortalError::SerializationError(format!("envelope payload: {e}")))?;

    // Build the cipher from the raw key bytes.
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CarePortalError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Generate a random 12-byte nonce.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // Encrypt and authenticate the payload.
    let ciphertext = cipher
        .encrypt(&nonce, payload.as_slice())
        .map_err(|e| CarePortalError::EncryptionFailed(format!("encryption error: {e}")))?;
    payload.zeroize();

    // Prepend the nonce so the envelope is self-sufficient for `open`.
    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(sealed))
}

/// Open an envelope produced by `seal`.
///
/// Malformed encoding, a truncated buffer, the wrong key, and any
/// flipped ciphertext byte all collapse into `DecryptFailed` — an
/// explicit error value the request handler maps to a 400-class
/// response.  No cipher detail leaks through the error.
pub fn open<T: DeserializeOwned>(key: &[u8], envelope: &str) -> Result<T> {
    let sealed = BASE64
        .decode(envelope)
        .map_err(|_| CarePortalError::DecryptFailed)?;

    // Make sure we have at least a nonce worth of bytes.
    if sealed.len() < NONCE_LEN {
        return Err(CarePortalError::DecryptFailed);
    }

    // Split nonce from ciphertext.
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CarePortalError::DecryptFailed)?;

    // Decrypt and verify the auth tag.
    let mut payload = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CarePortalError::DecryptFailed)?;

    let value = serde_json::from_slice(&payload);
    payload.zeroize();
    value.map_err(|_| CarePortalError::DecryptFailed)
}
