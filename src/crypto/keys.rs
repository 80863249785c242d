//! Sealing-key wrapper and HKDF-SHA256 field-key derivation.
//!
//! From a single sealing key we derive a unique **per-purpose** cipher
//! key for each class of protected field, so a password envelope and a
//! card envelope never share a raw key.
//!
//! HKDF (RFC 5869) uses the sealing key as input keying material and a
//! context string (`info`) to produce independent sub-keys.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::kdf::{self, KdfParams};
use crate::errors::{CarePortalError, Result};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// Field purpose for credential envelopes (passwords).
pub const FIELD_CREDENTIALS: &str = "credentials";

/// Field purpose for payment envelopes (card number, CVV, expiry).
pub const FIELD_PAYMENT: &str = "payment";

/// Derive a per-purpose cipher key from the sealing key.
///
/// `info` is set to `"careportal-field:<purpose>"` to bind the derived
/// key to one class of protected field.  Both ends of the wire derive
/// the same sub-key from the same purpose string.
pub fn derive_field_key(sealing_key: &[u8], purpose: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("careportal-field:{purpose}");
    hkdf_derive(sealing_key, info.as_bytes())
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// We skip the `extract` step and use the sealing key directly as the
/// pseudo-random key (PRK), because it already has high entropy (it
/// came from Argon2id).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CarePortalError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A wrapper around a 32-byte sealing key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SealingKey {
    bytes: [u8; KEY_LEN],
}

impl SealingKey {
    /// Create a new `SealingKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Stretch a root secret into a sealing key using the application
    /// salt and default KDF parameters.
    pub fn from_secret(root_secret: &[u8]) -> Result<Self> {
        Self::from_secret_with_params(root_secret, &KdfParams::default())
    }

    /// Stretch a root secret with explicit KDF parameters.
    pub fn from_secret_with_params(root_secret: &[u8], params: &KdfParams) -> Result<Self> {
        let mut bytes = kdf::derive_sealing_key_with_params(root_secret, kdf::APP_SALT, params)?;
        let key = Self::new(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Access the raw key bytes (e.g. to pass to HKDF or the cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive a per-purpose field key from this sealing key.
    pub fn derive_field_key(&self, purpose: &str) -> Result<[u8; KEY_LEN]> {
        derive_field_key(&self.bytes, purpose)
    }
}

// Intentionally no Debug/Display — key material must not reach logs.
impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealingKey").finish_non_exhaustive()
    }
}
